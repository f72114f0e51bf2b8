//! Local-only source of truth backed by the SQLite store.
//!
//! Substitutes for the hosted database end to end: same collections, same
//! uniqueness rules, same change feed. Writes are announced after they
//! commit.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_shared::{
    Conversation, ConversationId, Identity, Message, Participant, ParticipantStatus, UserId,
};
use pulse_store::{Database, StoreError};
use tokio::sync::broadcast;

use super::{ChangeEvent, ChangeFeed, SourceOfTruth, Table};
use crate::error::SourceError;

#[derive(Clone)]
pub struct LocalSource {
    db: Arc<Mutex<Database>>,
    feed: ChangeFeed,
}

impl LocalSource {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self {
            db,
            feed: ChangeFeed::new(),
        }
    }

    /// Shared handle, e.g. for a [`DatabaseSession`](crate::session::DatabaseSession).
    pub fn database(&self) -> Arc<Mutex<Database>> {
        self.db.clone()
    }

    fn db(&self) -> Result<MutexGuard<'_, Database>, SourceError> {
        self.db
            .lock()
            .map_err(|_| SourceError::Unavailable("database lock poisoned".into()))
    }
}

#[async_trait]
impl SourceOfTruth for LocalSource {
    async fn list_identities(&self) -> Result<Vec<Identity>, SourceError> {
        Ok(self.db()?.list_identities()?)
    }

    async fn get_identity(&self, id: &UserId) -> Result<Option<Identity>, SourceError> {
        match self.db()?.get_identity(id) {
            Ok(identity) => Ok(Some(identity)),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn insert_identity(&self, identity: &Identity) -> Result<(), SourceError> {
        self.db()?.insert_identity(identity).map_err(|e| match e {
            StoreError::Conflict => SourceError::Conflict(format!("identity {}", identity.id)),
            other => other.into(),
        })
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, SourceError> {
        Ok(self.db()?.list_conversations()?)
    }

    async fn insert_conversation(&self, conversation: &Conversation) -> Result<(), SourceError> {
        self.db()?.create_conversation(conversation)?;
        self.feed.publish(Table::Participants, conversation.id);
        Ok(())
    }

    async fn touch_conversation(
        &self,
        id: ConversationId,
        at: DateTime<Utc>,
    ) -> Result<(), SourceError> {
        self.db()?.touch_conversation(id, at).map_err(|e| match e {
            StoreError::NotFound => SourceError::NotFound(format!("conversation {id}")),
            other => other.into(),
        })
    }

    async fn insert_participant(
        &self,
        conversation_id: ConversationId,
        participant: &Participant,
    ) -> Result<(), SourceError> {
        self.db()?
            .insert_participant(conversation_id, participant)
            .map_err(|e| match e {
                StoreError::NotFound => {
                    SourceError::NotFound(format!("conversation {conversation_id}"))
                }
                StoreError::Conflict => SourceError::Conflict(format!(
                    "participant {} in {conversation_id}",
                    participant.user_id
                )),
                other => other.into(),
            })?;
        self.feed.publish(Table::Participants, conversation_id);
        Ok(())
    }

    async fn update_participant_status(
        &self,
        conversation_id: ConversationId,
        user_id: &UserId,
        status: ParticipantStatus,
    ) -> Result<usize, SourceError> {
        let changed = self
            .db()?
            .set_participant_status(conversation_id, user_id, status)?;
        if changed > 0 {
            self.feed.publish(Table::Participants, conversation_id);
        }
        Ok(changed)
    }

    async fn delete_participant(
        &self,
        conversation_id: ConversationId,
        user_id: &UserId,
    ) -> Result<usize, SourceError> {
        let removed = self.db()?.delete_participant(conversation_id, user_id)?;
        if removed > 0 {
            self.feed.publish(Table::Participants, conversation_id);
        }
        Ok(removed)
    }

    async fn insert_message(&self, message: &Message) -> Result<(), SourceError> {
        self.db()?.insert_message(message).map_err(|e| match e {
            StoreError::NotFound => {
                SourceError::NotFound(format!("conversation {}", message.conversation_id))
            }
            other => other.into(),
        })?;
        self.feed.publish(Table::Messages, message.conversation_id);
        Ok(())
    }

    async fn list_messages(&self, conversation_id: ConversationId) -> Result<Vec<Message>, SourceError> {
        let db = self.db()?;
        if !db.conversation_exists(conversation_id)? {
            return Err(SourceError::NotFound(format!("conversation {conversation_id}")));
        }
        Ok(db.messages_for_conversation(conversation_id)?)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe()
    }
}
