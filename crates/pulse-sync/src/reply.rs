//! Automatic replies.
//!
//! After a send into a group, or into a DM that includes the assistant, a
//! detached task asks the [`ReplyGenerator`] for an answer and appends it to
//! the conversation as a generated message. Nothing here ever fails the send
//! that triggered it: generator errors turn into a fixed fallback text, and
//! source errors are logged and dropped.

use std::sync::Arc;

use async_trait::async_trait;
use pulse_shared::constants::{REPLY_CONTEXT_WINDOW, REPLY_FALLBACK_TEXT, UNKNOWN_SENDER_LABEL};
use pulse_shared::{ConversationId, Message, UserId};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::directory::Directory;
use crate::error::ReplyError;
use crate::source::SourceOfTruth;

/// One line of conversation handed to the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub sender: String,
    pub text: String,
}

#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Produce a reply to `history` (oldest first), speaking as `label`.
    async fn generate_reply(
        &self,
        history: &[HistoryEntry],
        label: &str,
    ) -> Result<String, ReplyError>;
}

/// Everything one reply needs, captured at send time.
pub struct ReplyTrigger {
    pub(crate) source: Arc<dyn SourceOfTruth>,
    pub(crate) generator: Arc<dyn ReplyGenerator>,
    pub(crate) directory: Directory,
    pub(crate) assistant_id: UserId,
    pub(crate) label: String,
}

impl ReplyTrigger {
    /// Generate and append a reply to `conversation_id`. Returns the appended
    /// message, or `None` if the source could not be read or written.
    pub async fn run(&self, conversation_id: ConversationId) -> Option<Message> {
        let messages = match self.source.list_messages(conversation_id).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!(conversation = %conversation_id, error = %e, "Reply skipped, history unavailable");
                return None;
            }
        };

        let history = self.history(&messages);
        debug!(conversation = %conversation_id, lines = history.len(), "Requesting reply");

        let text = match self.generator.generate_reply(&history, &self.label).await {
            Ok(text) => text,
            Err(e) => {
                warn!(conversation = %conversation_id, error = %e, "Reply generator failed");
                REPLY_FALLBACK_TEXT.to_string()
            }
        };

        let reply = Message::generated(conversation_id, self.assistant_id.clone(), text);
        match self.source.insert_message(&reply).await {
            Ok(()) => {
                info!(conversation = %conversation_id, message = %reply.id, "Reply appended");
                Some(reply)
            }
            Err(e) => {
                warn!(conversation = %conversation_id, error = %e, "Failed to append reply");
                None
            }
        }
    }

    /// The most recent messages, oldest first, with senders named.
    fn history(&self, messages: &[Message]) -> Vec<HistoryEntry> {
        let start = messages.len().saturating_sub(REPLY_CONTEXT_WINDOW);
        messages[start..]
            .iter()
            .map(|m| HistoryEntry {
                sender: self
                    .directory
                    .display_name(&m.sender_id)
                    .unwrap_or(UNKNOWN_SENDER_LABEL)
                    .to_string(),
                text: m.text.clone(),
            })
            .collect()
    }
}
