//! In-process source of truth.
//!
//! Holds the four collections in memory and publishes the same change feed as
//! the persistent sources. Outages and response latency can be injected, which
//! is how overlapping refreshes and remote failures are exercised.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_shared::{
    Conversation, ConversationId, Identity, Message, Participant, ParticipantStatus, UserId,
};
use tokio::sync::broadcast;

use super::{ChangeEvent, ChangeFeed, SourceOfTruth, Table};
use crate::error::SourceError;

#[derive(Default)]
struct Tables {
    identities: Vec<Identity>,
    conversations: Vec<Conversation>,
}

impl Tables {
    fn conversation_mut(&mut self, id: ConversationId) -> Result<&mut Conversation, SourceError> {
        self.conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| SourceError::NotFound(format!("conversation {id}")))
    }
}

pub struct MemorySource {
    tables: Mutex<Tables>,
    feed: ChangeFeed,
    online: AtomicBool,
    latency: Mutex<Duration>,
    conversation_fetches: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            feed: ChangeFeed::new(),
            online: AtomicBool::new(true),
            latency: Mutex::new(Duration::ZERO),
            conversation_fetches: AtomicUsize::new(0),
        }
    }

    /// While offline every call fails with `Unavailable`.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Delay applied to every response after the data has been read, so a
    /// slow response carries the state from when the call was made.
    pub fn set_latency(&self, latency: Duration) {
        if let Ok(mut guard) = self.latency.lock() {
            *guard = latency;
        }
    }

    /// How many times `list_conversations` has been called.
    pub fn conversation_fetches(&self) -> usize {
        self.conversation_fetches.load(Ordering::SeqCst)
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, SourceError> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(SourceError::Unavailable("memory source is offline".into()));
        }
        self.tables
            .lock()
            .map_err(|_| SourceError::Unavailable("memory source lock poisoned".into()))
    }

    async fn respond<T>(&self, result: Result<T, SourceError>) -> Result<T, SourceError> {
        let latency = self.latency.lock().map(|l| *l).unwrap_or_default();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        result
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceOfTruth for MemorySource {
    async fn list_identities(&self) -> Result<Vec<Identity>, SourceError> {
        let result = self.tables().map(|t| {
            let mut identities = t.identities.clone();
            identities.sort_by_key(|i| i.display_name.to_lowercase());
            identities
        });
        self.respond(result).await
    }

    async fn get_identity(&self, id: &UserId) -> Result<Option<Identity>, SourceError> {
        let result = self
            .tables()
            .map(|t| t.identities.iter().find(|i| &i.id == id).cloned());
        self.respond(result).await
    }

    async fn insert_identity(&self, identity: &Identity) -> Result<(), SourceError> {
        let result = self.tables().and_then(|mut t| {
            if t.identities.iter().any(|i| i.id == identity.id) {
                return Err(SourceError::Conflict(format!("identity {}", identity.id)));
            }
            t.identities.push(identity.clone());
            Ok(())
        });
        self.respond(result).await
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, SourceError> {
        self.conversation_fetches.fetch_add(1, Ordering::SeqCst);
        let result = self.tables().map(|t| {
            let mut conversations = t.conversations.clone();
            conversations.sort_by(|a, b| b.last_active_at.cmp(&a.last_active_at));
            conversations
        });
        self.respond(result).await
    }

    async fn insert_conversation(&self, conversation: &Conversation) -> Result<(), SourceError> {
        let result = self.tables().and_then(|mut t| {
            if t.conversations.iter().any(|c| c.id == conversation.id) {
                return Err(SourceError::Conflict(format!("conversation {}", conversation.id)));
            }
            let mut row = conversation.clone();
            row.messages.clear();
            for p in &mut row.participants {
                p.user = None;
            }
            t.conversations.push(row);
            Ok(())
        });
        if result.is_ok() {
            self.feed.publish(Table::Participants, conversation.id);
        }
        self.respond(result).await
    }

    async fn touch_conversation(
        &self,
        id: ConversationId,
        at: DateTime<Utc>,
    ) -> Result<(), SourceError> {
        let result = self.tables().and_then(|mut t| {
            t.conversation_mut(id)?.last_active_at = at;
            Ok(())
        });
        self.respond(result).await
    }

    async fn insert_participant(
        &self,
        conversation_id: ConversationId,
        participant: &Participant,
    ) -> Result<(), SourceError> {
        let result = self.tables().and_then(|mut t| {
            let conversation = t.conversation_mut(conversation_id)?;
            if conversation.has_participant(&participant.user_id) {
                return Err(SourceError::Conflict(format!(
                    "participant {} in {conversation_id}",
                    participant.user_id
                )));
            }
            conversation.participants.push(Participant {
                user: None,
                ..participant.clone()
            });
            Ok(())
        });
        if result.is_ok() {
            self.feed.publish(Table::Participants, conversation_id);
        }
        self.respond(result).await
    }

    async fn update_participant_status(
        &self,
        conversation_id: ConversationId,
        user_id: &UserId,
        status: ParticipantStatus,
    ) -> Result<usize, SourceError> {
        let result = self.tables().map(|mut t| {
            let mut changed = 0;
            if let Ok(conversation) = t.conversation_mut(conversation_id) {
                for p in conversation.participants.iter_mut().filter(|p| &p.user_id == user_id) {
                    p.status = status;
                    changed += 1;
                }
            }
            changed
        });
        if matches!(result, Ok(n) if n > 0) {
            self.feed.publish(Table::Participants, conversation_id);
        }
        self.respond(result).await
    }

    async fn delete_participant(
        &self,
        conversation_id: ConversationId,
        user_id: &UserId,
    ) -> Result<usize, SourceError> {
        let result = self.tables().map(|mut t| match t.conversation_mut(conversation_id) {
            Ok(conversation) => {
                let before = conversation.participants.len();
                conversation.participants.retain(|p| &p.user_id != user_id);
                before - conversation.participants.len()
            }
            Err(_) => 0,
        });
        if matches!(result, Ok(n) if n > 0) {
            self.feed.publish(Table::Participants, conversation_id);
        }
        self.respond(result).await
    }

    async fn insert_message(&self, message: &Message) -> Result<(), SourceError> {
        let result = self.tables().and_then(|mut t| {
            let conversation = t.conversation_mut(message.conversation_id)?;
            if conversation.contains_message(message.id) {
                return Err(SourceError::Conflict(format!("message {}", message.id)));
            }
            conversation.push_message(message.clone());
            Ok(())
        });
        if result.is_ok() {
            self.feed.publish(Table::Messages, message.conversation_id);
        }
        self.respond(result).await
    }

    async fn list_messages(&self, conversation_id: ConversationId) -> Result<Vec<Message>, SourceError> {
        let result = self.tables().and_then(|mut t| {
            t.conversation_mut(conversation_id)
                .map(|c| c.messages.clone())
        });
        self.respond(result).await
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(s: &str) -> UserId {
        UserId::from(s)
    }

    #[tokio::test]
    async fn test_writes_are_announced() {
        let source = MemorySource::new();
        let mut feed = source.subscribe();

        let group = Conversation::new_group(uid("usr-a"), "Ops");
        source.insert_conversation(&group).await.unwrap();
        source
            .insert_message(&Message::new(group.id, uid("usr-a"), "hi"))
            .await
            .unwrap();

        assert_eq!(feed.recv().await.unwrap().table, Table::Participants);
        let event = feed.recv().await.unwrap();
        assert_eq!(event.table, Table::Messages);
        assert_eq!(event.conversation_id, group.id);
    }

    #[tokio::test]
    async fn test_participant_pair_is_unique() {
        let source = MemorySource::new();
        let group = Conversation::new_group(uid("usr-a"), "Ops");
        source.insert_conversation(&group).await.unwrap();

        let bob = Participant::pending(uid("usr-b"));
        source.insert_participant(group.id, &bob).await.unwrap();
        let err = source.insert_participant(group.id, &bob).await.unwrap_err();
        assert!(matches!(err, SourceError::Conflict(_)));

        let err = source
            .insert_participant(ConversationId::new(), &bob)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_offline_fails_every_call() {
        let source = MemorySource::new();
        source.set_online(false);
        assert!(matches!(
            source.list_identities().await,
            Err(SourceError::Unavailable(_))
        ));
        source.set_online(true);
        assert!(source.list_identities().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete_counts() {
        let source = MemorySource::new();
        let group = Conversation::new_group(uid("usr-a"), "Ops");
        source.insert_conversation(&group).await.unwrap();
        source
            .insert_participant(group.id, &Participant::pending(uid("usr-b")))
            .await
            .unwrap();

        let changed = source
            .update_participant_status(group.id, &uid("usr-b"), ParticipantStatus::Joined)
            .await
            .unwrap();
        assert_eq!(changed, 1);
        assert_eq!(source.delete_participant(group.id, &uid("usr-x")).await.unwrap(), 0);
        assert_eq!(source.delete_participant(group.id, &uid("usr-b")).await.unwrap(), 1);
    }
}
