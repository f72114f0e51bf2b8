//! In-memory conversation store.
//!
//! Holds only conversations visible to the signed-in user. A refresh replaces
//! the whole set; between refreshes, messages may be merged in one at a time
//! and are deduplicated by id.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use pulse_shared::{Conversation, ConversationId, Message, UserId};
use tracing::warn;

use crate::directory::Directory;

/// What happened to a message offered to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingest {
    Appended,
    Duplicate,
    UnknownConversation,
}

#[derive(Debug, Default, Clone)]
pub struct ConversationStore {
    conversations: HashMap<ConversationId, Conversation>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the conversations `viewer` has joined, normalize them and attach
    /// directory entries to their participants, then swap them in wholesale.
    /// Returns the number of visible conversations.
    pub fn replace_visible(
        &mut self,
        viewer: &UserId,
        fetched: Vec<Conversation>,
        directory: &Directory,
    ) -> usize {
        let mut visible = HashMap::with_capacity(fetched.len());

        for mut conversation in fetched {
            if !conversation.is_visible_to(viewer) {
                continue;
            }

            let dropped = conversation.normalize();
            if dropped > 0 {
                warn!(
                    conversation = %conversation.id,
                    dropped,
                    "duplicate participant rows ignored"
                );
            }

            for participant in &mut conversation.participants {
                participant.user = directory.get(&participant.user_id).cloned();
            }

            visible.insert(conversation.id, conversation);
        }

        self.conversations = visible;
        self.conversations.len()
    }

    pub fn get(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.get(&id)
    }

    /// Most recently active first.
    pub fn list(&self) -> Vec<Conversation> {
        let mut all: Vec<Conversation> = self.conversations.values().cloned().collect();
        all.sort_by(|a, b| {
            b.last_active_at
                .cmp(&a.last_active_at)
                .then_with(|| a.id.0.cmp(&b.id.0))
        });
        all
    }

    /// Cached DM between `a` and `b`, if any. Never queries the source.
    pub fn find_dm(&self, a: &UserId, b: &UserId) -> Option<&Conversation> {
        self.conversations.values().find(|c| c.is_dm_between(a, b))
    }

    pub fn ingest_message(&mut self, message: Message) -> Ingest {
        match self.conversations.get_mut(&message.conversation_id) {
            None => Ingest::UnknownConversation,
            Some(conversation) => {
                if conversation.push_message(message) {
                    Ingest::Appended
                } else {
                    Ingest::Duplicate
                }
            }
        }
    }

    /// Merge a batch of messages into one conversation. Returns how many
    /// were new.
    pub fn merge_messages(&mut self, id: ConversationId, messages: Vec<Message>) -> usize {
        let Some(conversation) = self.conversations.get_mut(&id) else {
            return 0;
        };
        messages
            .into_iter()
            .filter(|m| m.conversation_id == id)
            .map(|m| conversation.push_message(m))
            .filter(|appended| *appended)
            .count()
    }

    /// Bump `last_active_at`; never moves it backwards.
    pub fn touch(&mut self, id: ConversationId, at: DateTime<Utc>) {
        if let Some(conversation) = self.conversations.get_mut(&id) {
            if at > conversation.last_active_at {
                conversation.last_active_at = at;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn clear(&mut self) {
        self.conversations.clear();
    }
}
