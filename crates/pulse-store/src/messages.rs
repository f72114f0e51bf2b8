use pulse_shared::{ConversationId, Message, MessageId, UserId};
use rusqlite::params;

use crate::database::Database;
use crate::error::{on_read, on_write, Result, StoreError};
use crate::row::{parse_text, parse_timestamp, timestamp};

impl Database {
    pub fn insert_message(&self, message: &Message) -> Result<()> {
        if !self.conversation_exists(message.conversation_id)? {
            return Err(StoreError::NotFound);
        }

        self.conn()
            .execute(
                "INSERT INTO messages (id, conversation_id, sender_id, text, is_generated, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    message.id.to_string(),
                    message.conversation_id.to_string(),
                    message.sender_id.as_str(),
                    message.text,
                    message.is_generated,
                    timestamp(&message.created_at),
                ],
            )
            .map_err(on_write)?;
        Ok(())
    }

    /// Every message of a conversation, oldest first.
    pub fn messages_for_conversation(&self, conversation_id: ConversationId) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, conversation_id, sender_id, text, is_generated, created_at
             FROM messages
             WHERE conversation_id = ?1
             ORDER BY created_at ASC, rowid ASC",
        )?;

        let rows = stmt.query_map(params![conversation_id.to_string()], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    pub fn get_message_by_id(&self, id: MessageId) -> Result<Message> {
        self.conn()
            .query_row(
                "SELECT id, conversation_id, sender_id, text, is_generated, created_at
                 FROM messages WHERE id = ?1",
                params![id.to_string()],
                row_to_message,
            )
            .map_err(on_read)
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id_str: String = row.get(0)?;
    let conversation_id_str: String = row.get(1)?;
    let sender_id: String = row.get(2)?;
    let text: String = row.get(3)?;
    let is_generated: bool = row.get(4)?;
    let ts_str: String = row.get(5)?;

    Ok(Message {
        id: parse_text(0, &id_str)?,
        conversation_id: parse_text(1, &conversation_id_str)?,
        sender_id: UserId(sender_id),
        text,
        is_generated,
        created_at: parse_timestamp(5, &ts_str)?,
    })
}
