//! The source of truth the client reconciles against.
//!
//! [`SourceOfTruth`] is the seam between the sync core and whatever holds the
//! authoritative data: a hosted database in connected mode, the local SQLite
//! store in local-only mode ([`LocalSource`]), or plain memory
//! ([`MemorySource`]). Every implementation exposes the same four collections
//! and the same change feed, so the engine cannot tell them apart.
//!
//! Change notifications carry no record payload. Handlers are expected to
//! re-fetch.

mod local;
mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_shared::{
    Conversation, ConversationId, Identity, Message, Participant, ParticipantStatus, UserId,
};
use tokio::sync::broadcast;

use crate::error::SourceError;

pub use local::LocalSource;
pub use memory::MemorySource;

/// Buffered notifications per subscriber before it starts lagging.
const FEED_CAPACITY: usize = 256;

/// Which collection a write touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Messages,
    Participants,
}

/// "Something changed in `table` for `conversation_id`."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub table: Table,
    pub conversation_id: ConversationId,
}

#[async_trait]
pub trait SourceOfTruth: Send + Sync {
    /// Every registered identity.
    async fn list_identities(&self) -> Result<Vec<Identity>, SourceError>;

    async fn get_identity(&self, id: &UserId) -> Result<Option<Identity>, SourceError>;

    /// `Conflict` if the id is already registered.
    async fn insert_identity(&self, identity: &Identity) -> Result<(), SourceError>;

    /// Every conversation with its participants and messages (oldest first),
    /// most recently active first.
    async fn list_conversations(&self) -> Result<Vec<Conversation>, SourceError>;

    /// Insert a conversation and the participant rows it carries.
    async fn insert_conversation(&self, conversation: &Conversation) -> Result<(), SourceError>;

    async fn touch_conversation(
        &self,
        id: ConversationId,
        at: DateTime<Utc>,
    ) -> Result<(), SourceError>;

    /// `NotFound` for an unknown conversation, `Conflict` if the user already
    /// has a row in it.
    async fn insert_participant(
        &self,
        conversation_id: ConversationId,
        participant: &Participant,
    ) -> Result<(), SourceError>;

    /// Returns the number of rows changed.
    async fn update_participant_status(
        &self,
        conversation_id: ConversationId,
        user_id: &UserId,
        status: ParticipantStatus,
    ) -> Result<usize, SourceError>;

    /// Returns the number of rows removed.
    async fn delete_participant(
        &self,
        conversation_id: ConversationId,
        user_id: &UserId,
    ) -> Result<usize, SourceError>;

    async fn insert_message(&self, message: &Message) -> Result<(), SourceError>;

    /// Messages of one conversation, oldest first.
    async fn list_messages(&self, conversation_id: ConversationId) -> Result<Vec<Message>, SourceError>;

    /// Notifications for every write to `messages` or `participants`.
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}

/// Fan-out of [`ChangeEvent`]s to every subscriber.
#[derive(Debug, Clone)]
pub(crate) struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub(crate) fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn publish(&self, table: Table, conversation_id: ConversationId) {
        // No subscribers is fine.
        let _ = self.tx.send(ChangeEvent {
            table,
            conversation_id,
        });
    }
}
