//! Membership rows.  One row per `(conversation_id, user_id)`, enforced by
//! a unique index.

use pulse_shared::{ConversationId, Participant, ParticipantStatus, UserId};
use rusqlite::params;

use crate::database::Database;
use crate::error::{on_write, Result, StoreError};
use crate::row::parse_text;

impl Database {
    /// Add a member row. `NotFound` if the conversation does not exist,
    /// `Conflict` if the user already has a row there.
    pub fn insert_participant(
        &self,
        conversation_id: ConversationId,
        participant: &Participant,
    ) -> Result<()> {
        if !self.conversation_exists(conversation_id)? {
            return Err(StoreError::NotFound);
        }

        self.conn()
            .execute(
                "INSERT INTO participants (conversation_id, user_id, is_admin, status)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    conversation_id.to_string(),
                    participant.user_id.as_str(),
                    participant.is_admin,
                    participant.status.as_str(),
                ],
            )
            .map_err(on_write)?;
        Ok(())
    }

    /// Member rows of a conversation, in insertion order.
    pub fn participants_for(&self, conversation_id: ConversationId) -> Result<Vec<Participant>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id, is_admin, status
             FROM participants
             WHERE conversation_id = ?1
             ORDER BY rowid ASC",
        )?;

        let rows = stmt.query_map(params![conversation_id.to_string()], row_to_participant)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Returns the number of rows changed (0 or 1).
    pub fn set_participant_status(
        &self,
        conversation_id: ConversationId,
        user_id: &UserId,
        status: ParticipantStatus,
    ) -> Result<usize> {
        let affected = self.conn().execute(
            "UPDATE participants SET status = ?1 WHERE conversation_id = ?2 AND user_id = ?3",
            params![status.as_str(), conversation_id.to_string(), user_id.as_str()],
        )?;
        Ok(affected)
    }

    /// Returns the number of rows removed (0 or 1).
    pub fn delete_participant(&self, conversation_id: ConversationId, user_id: &UserId) -> Result<usize> {
        let affected = self.conn().execute(
            "DELETE FROM participants WHERE conversation_id = ?1 AND user_id = ?2",
            params![conversation_id.to_string(), user_id.as_str()],
        )?;
        Ok(affected)
    }
}

fn row_to_participant(row: &rusqlite::Row<'_>) -> rusqlite::Result<Participant> {
    let user_id: String = row.get(0)?;
    let is_admin: bool = row.get(1)?;
    let status_str: String = row.get(2)?;

    Ok(Participant {
        user_id: UserId(user_id),
        is_admin,
        status: parse_text(2, &status_str)?,
        user: None,
    })
}
