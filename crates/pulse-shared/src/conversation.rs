//! Conversations, their participants and messages.
//!
//! These are plain value records. The source of truth hands out copies, the
//! client's conversation store keeps its own, and nothing is shared mutably.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::UNTITLED_GROUP_NAME;
use crate::identity::Identity;
use crate::types::{ConversationId, ConversationKind, MessageId, ParticipantStatus, UserId};

/// Membership row of one user in one conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub user_id: UserId,
    #[serde(default)]
    pub is_admin: bool,
    pub status: ParticipantStatus,
    /// Directory entry of the user, filled in when the client ingests the row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Identity>,
}

impl Participant {
    pub fn joined(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: false,
            status: ParticipantStatus::Joined,
            user: None,
        }
    }

    pub fn pending(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: false,
            status: ParticipantStatus::Pending,
            user: None,
        }
    }

    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: true,
            status: ParticipantStatus::Joined,
            user: None,
        }
    }

    pub fn is_joined(&self) -> bool {
        self.status == ParticipantStatus::Joined
    }
}

/// A single chat message. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub text: String,
    /// Written by the reply generator rather than a person.
    #[serde(default)]
    pub is_generated: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(conversation_id: ConversationId, sender_id: UserId, text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id,
            sender_id,
            text: text.into(),
            is_generated: false,
            created_at: Utc::now(),
        }
    }

    pub fn generated(conversation_id: ConversationId, sender_id: UserId, text: impl Into<String>) -> Self {
        Self {
            is_generated: true,
            ..Self::new(conversation_id, sender_id, text)
        }
    }
}

/// A DM or group with its membership and message history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    pub id: ConversationId,
    pub kind: ConversationKind,
    /// Present iff `kind` is `Group`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub last_active_at: DateTime<Utc>,
    #[serde(default)]
    pub participants: Vec<Participant>,
    /// Ascending by `created_at`.
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Conversation {
    /// A DM between two users, both already joined.
    pub fn new_dm(a: UserId, b: UserId) -> Self {
        Self {
            id: ConversationId::new(),
            kind: ConversationKind::Dm,
            name: None,
            last_active_at: Utc::now(),
            participants: vec![Participant::joined(a), Participant::joined(b)],
            messages: Vec::new(),
        }
    }

    /// A group whose only member is its creator, joined and admin.
    pub fn new_group(creator: UserId, name: impl Into<String>) -> Self {
        Self {
            id: ConversationId::new(),
            kind: ConversationKind::Group,
            name: Some(name.into()),
            last_active_at: Utc::now(),
            participants: vec![Participant::admin(creator)],
            messages: Vec::new(),
        }
    }

    pub fn is_group(&self) -> bool {
        self.kind == ConversationKind::Group
    }

    pub fn participant(&self, user_id: &UserId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.user_id == user_id)
    }

    pub fn has_participant(&self, user_id: &UserId) -> bool {
        self.participant(user_id).is_some()
    }

    /// A user sees a conversation only through a joined membership row.
    pub fn is_visible_to(&self, user_id: &UserId) -> bool {
        self.participants
            .iter()
            .any(|p| &p.user_id == user_id && p.is_joined())
    }

    pub fn is_admin(&self, user_id: &UserId) -> bool {
        self.participants
            .iter()
            .any(|p| &p.user_id == user_id && p.is_joined() && p.is_admin)
    }

    pub fn is_dm_between(&self, a: &UserId, b: &UserId) -> bool {
        self.kind == ConversationKind::Dm && self.has_participant(a) && self.has_participant(b)
    }

    pub fn pending_requests(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| !p.is_joined())
    }

    /// The peer in a DM, from `user_id`'s point of view.
    pub fn counterpart(&self, user_id: &UserId) -> Option<&Participant> {
        match self.kind {
            ConversationKind::Dm => self.participants.iter().find(|p| &p.user_id != user_id),
            ConversationKind::Group => None,
        }
    }

    /// Title as shown in a conversation list.
    pub fn title(&self, viewer: &UserId) -> String {
        match self.kind {
            ConversationKind::Group => self
                .name
                .clone()
                .unwrap_or_else(|| UNTITLED_GROUP_NAME.to_string()),
            ConversationKind::Dm => self
                .counterpart(viewer)
                .map(|p| {
                    p.user
                        .as_ref()
                        .map(|u| u.display_name.clone())
                        .unwrap_or_else(|| p.user_id.to_string())
                })
                .unwrap_or_else(|| "Direct message".to_string()),
        }
    }

    pub fn contains_message(&self, id: MessageId) -> bool {
        self.messages.iter().any(|m| m.id == id)
    }

    /// Append a message, keeping `created_at` order. A message whose id is
    /// already present is dropped; returns whether the list changed.
    pub fn push_message(&mut self, message: Message) -> bool {
        if self.contains_message(message.id) {
            return false;
        }
        let at = self
            .messages
            .partition_point(|m| m.created_at <= message.created_at);
        self.messages.insert(at, message);
        true
    }

    /// The last `n` messages, oldest first.
    pub fn recent_messages(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// Bring a record received from outside into shape: groups always have a
    /// name, DMs never do, one row per participant, messages in order.
    /// Returns how many duplicate participant rows were dropped.
    pub fn normalize(&mut self) -> usize {
        match self.kind {
            ConversationKind::Group => {
                let missing = self.name.as_deref().map_or(true, |n| n.trim().is_empty());
                if missing {
                    self.name = Some(UNTITLED_GROUP_NAME.to_string());
                }
            }
            ConversationKind::Dm => self.name = None,
        }

        let before = self.participants.len();
        let mut seen = HashSet::new();
        self.participants.retain(|p| seen.insert(p.user_id.clone()));

        self.messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        before - self.participants.len()
    }
}
