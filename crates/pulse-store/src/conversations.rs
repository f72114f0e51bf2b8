//! CRUD operations for [`Conversation`] records.
//!
//! A conversation read from the store is fully assembled: its participant
//! rows in insertion order and its messages oldest first.

use chrono::{DateTime, Utc};
use pulse_shared::{Conversation, ConversationId, ConversationKind};
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::{on_read, on_write, Result, StoreError};
use crate::row::{parse_text, parse_timestamp, timestamp};

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a conversation together with the participant rows it carries.
    pub fn create_conversation(&self, conversation: &Conversation) -> Result<()> {
        let tx = self.conn().unchecked_transaction()?;

        tx.execute(
            "INSERT INTO conversations (id, kind, name, last_active_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                conversation.id.to_string(),
                conversation.kind.as_str(),
                conversation.name,
                timestamp(&conversation.last_active_at),
            ],
        )
        .map_err(on_write)?;

        for p in &conversation.participants {
            tx.execute(
                "INSERT INTO participants (conversation_id, user_id, is_admin, status)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    conversation.id.to_string(),
                    p.user_id.as_str(),
                    p.is_admin,
                    p.status.as_str(),
                ],
            )
            .map_err(on_write)?;
        }

        tx.commit()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn conversation_exists(&self, id: ConversationId) -> Result<bool> {
        let found = self
            .conn()
            .query_row(
                "SELECT 1 FROM conversations WHERE id = ?1",
                params![id.to_string()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Fetch a single conversation with participants and messages.
    pub fn get_conversation(&self, id: ConversationId) -> Result<Conversation> {
        let mut conversation = self
            .conn()
            .query_row(
                "SELECT id, kind, name, last_active_at FROM conversations WHERE id = ?1",
                params![id.to_string()],
                row_to_conversation,
            )
            .map_err(on_read)?;

        conversation.participants = self.participants_for(id)?;
        conversation.messages = self.messages_for_conversation(id)?;
        Ok(conversation)
    }

    /// List every conversation, most recently active first.
    pub fn list_conversations(&self) -> Result<Vec<Conversation>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, kind, name, last_active_at
             FROM conversations
             ORDER BY last_active_at DESC",
        )?;
        let rows = stmt.query_map([], row_to_conversation)?;

        let mut conversations = Vec::new();
        for row in rows {
            let mut conversation = row?;
            conversation.participants = self.participants_for(conversation.id)?;
            conversation.messages = self.messages_for_conversation(conversation.id)?;
            conversations.push(conversation);
        }
        Ok(conversations)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Set `last_active_at`.
    pub fn touch_conversation(&self, id: ConversationId, at: DateTime<Utc>) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE conversations SET last_active_at = ?1 WHERE id = ?2",
            params![timestamp(&at), id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Conversation`] without its children.
fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    let id_str: String = row.get(0)?;
    let kind_str: String = row.get(1)?;
    let name: Option<String> = row.get(2)?;
    let last_active_str: String = row.get(3)?;

    let id: ConversationId = parse_text(0, &id_str)?;
    let kind: ConversationKind = parse_text(1, &kind_str)?;
    let last_active_at = parse_timestamp(3, &last_active_str)?;

    Ok(Conversation {
        id,
        kind,
        name,
        last_active_at,
        participants: Vec::new(),
        messages: Vec::new(),
    })
}
