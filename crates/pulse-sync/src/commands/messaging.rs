use pulse_shared::{Conversation, ConversationId, Message};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::SyncEngine;
use crate::error::{Result, SyncError};
use crate::reply::ReplyTrigger;
use crate::store::Ingest;

/// A message that was sent, plus the reply task it started (if any).
/// Dropping the handle detaches the task; awaiting it yields the reply.
#[derive(Debug)]
pub struct Sent {
    pub message: Message,
    pub reply_task: Option<JoinHandle<Option<Message>>>,
}

impl SyncEngine {
    /// Post `text` to a conversation the signed-in user has joined.
    /// Blank text sends nothing and returns `Ok(None)`.
    pub async fn send_message(
        &self,
        conversation_id: ConversationId,
        text: &str,
    ) -> Result<Option<Sent>> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let me = self.require_identity()?;
        let conversation = self
            .conversation(conversation_id)
            .ok_or(SyncError::UnknownConversation(conversation_id))?;

        let message = Message::new(conversation_id, me.id.clone(), text);
        let source = &self.context().source;
        source.insert_message(&message).await?;

        if let Err(e) = source
            .touch_conversation(conversation_id, message.created_at)
            .await
        {
            warn!(conversation = %conversation_id, error = %e, "Failed to bump conversation activity");
        }

        {
            let mut state = self.state();
            state.conversations.ingest_message(message.clone());
            state.conversations.touch(conversation_id, message.created_at);
        }
        info!(conversation = %conversation_id, message = %message.id, "Message sent");

        let reply_task = if self.wants_reply(&conversation) {
            Some(self.spawn_reply(conversation_id))
        } else {
            None
        };

        self.refresh_after_write().await;
        Ok(Some(Sent {
            message,
            reply_task,
        }))
    }

    /// Groups always get a reply; DMs only when the assistant is in them.
    fn wants_reply(&self, conversation: &Conversation) -> bool {
        conversation.is_group() || conversation.has_participant(&self.config().assistant_id)
    }

    fn spawn_reply(&self, conversation_id: ConversationId) -> JoinHandle<Option<Message>> {
        let trigger = ReplyTrigger {
            source: self.context().source.clone(),
            generator: self.context().generator.clone(),
            directory: self.state().directory.clone(),
            assistant_id: self.config().assistant_id.clone(),
            label: self.config().assistant_label.clone(),
        };
        let engine = self.clone();

        tokio::spawn(async move {
            let reply = trigger.run(conversation_id).await?;
            engine.ingest_message(reply.clone());
            Some(reply)
        })
    }

    /// Make a conversation the active one and merge its full message
    /// history into the cache.
    pub async fn open_conversation(&self, conversation_id: ConversationId) -> Result<Conversation> {
        if self.conversation(conversation_id).is_none() {
            return Err(SyncError::UnknownConversation(conversation_id));
        }
        self.set_active(conversation_id);

        let messages = self
            .context()
            .source
            .list_messages(conversation_id)
            .await?;

        let mut state = self.state();
        let merged = state.conversations.merge_messages(conversation_id, messages);
        debug!(conversation = %conversation_id, merged, "Conversation opened");
        state
            .conversations
            .get(conversation_id)
            .cloned()
            .ok_or(SyncError::UnknownConversation(conversation_id))
    }

    /// Add an incoming message to its cached conversation. A message whose
    /// id is already cached is ignored.
    pub fn ingest_message(&self, message: Message) -> Ingest {
        let id = message.id;
        let outcome = self.state().conversations.ingest_message(message);
        if outcome == Ingest::UnknownConversation {
            debug!(message = %id, "Message for a conversation not in view");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pulse_shared::constants::REPLY_FALLBACK_TEXT;
    use pulse_shared::{ParticipantStatus, UserId};

    use super::*;
    use crate::source::{MemorySource, SourceOfTruth};
    use crate::testing::{signed_in, ScriptedGenerator};

    fn quiet() -> Arc<ScriptedGenerator> {
        Arc::new(ScriptedGenerator::replying(std::iter::empty()))
    }

    #[tokio::test]
    async fn test_blank_text_sends_nothing() {
        let source = Arc::new(MemorySource::new());
        let ada = signed_in(&source, &quiet(), "Ada").await;
        let group = ada.create_group("Ops").await.unwrap();

        assert!(ada.send_message(group.id, "").await.unwrap().is_none());
        assert!(ada.send_message(group.id, "   ").await.unwrap().is_none());

        let cached = ada.conversation(group.id).unwrap();
        assert!(cached.messages.is_empty());
        assert_eq!(cached.last_active_at, group.last_active_at);
        assert!(source.list_messages(group.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_plain_dm_gets_no_reply() {
        let source = Arc::new(MemorySource::new());
        let generator = quiet();
        let ada = signed_in(&source, &generator, "Ada").await;
        let dm = ada.create_dm(&UserId::from("usr-bob")).await.unwrap();

        let sent = ada.send_message(dm.id, "hey").await.unwrap().unwrap();

        assert!(sent.reply_task.is_none());
        assert!(!sent.message.is_generated);
        assert_eq!(ada.conversation(dm.id).unwrap().messages, vec![sent.message]);
        assert!(generator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_dm_with_assistant_gets_reply() {
        let source = Arc::new(MemorySource::new());
        let generator = Arc::new(ScriptedGenerator::replying(["hi Ada"]));
        let ada = signed_in(&source, &generator, "Ada").await;
        let dm = ada.create_dm(&UserId::from("usr-001")).await.unwrap();

        let sent = ada.send_message(dm.id, "hello?").await.unwrap().unwrap();
        let reply = sent.reply_task.unwrap().await.unwrap().unwrap();

        assert_eq!(reply.text, "hi Ada");
        assert_eq!(reply.sender_id, UserId::from("usr-001"));
        let cached = ada.conversation(dm.id).unwrap();
        assert_eq!(cached.messages.len(), 2);
        assert!(cached.messages[1].is_generated);
    }

    #[tokio::test]
    async fn test_sending_to_unknown_conversation() {
        let source = Arc::new(MemorySource::new());
        let ada = signed_in(&source, &quiet(), "Ada").await;

        let err = ada.send_message(ConversationId::new(), "x").await.unwrap_err();
        assert!(matches!(err, SyncError::UnknownConversation(_)));
    }

    #[tokio::test]
    async fn test_ops_scenario() {
        let source = Arc::new(MemorySource::new());
        let generator = Arc::new(ScriptedGenerator::replying(["Hi all"]));
        let ada = signed_in(&source, &generator, "A").await;
        let bob = signed_in(&source, &generator, "B").await;
        let ada_id = ada.identity().unwrap().id;
        let bob_id = bob.identity().unwrap().id;

        let group = ada.create_group("Ops").await.unwrap();
        assert_eq!(group.participants.len(), 1);
        assert!(group.is_admin(&ada_id));

        bob.request_join(group.id).await.unwrap();
        ada.refresh().await.unwrap();
        let pending = ada.conversation(group.id).unwrap();
        assert_eq!(pending.participants.len(), 2);
        assert_eq!(pending.participant(&bob_id).unwrap().status, ParticipantStatus::Pending);

        ada.resolve_request(group.id, &bob_id, true).await.unwrap();
        let joined = ada.conversation(group.id).unwrap();
        let member = joined.participant(&bob_id).unwrap();
        assert_eq!(member.status, ParticipantStatus::Joined);
        assert!(!member.is_admin);

        let before = joined.last_active_at;
        let sent = ada.send_message(group.id, "hello team").await.unwrap().unwrap();
        sent.reply_task.unwrap().await.unwrap();
        ada.refresh().await.unwrap();

        let after = ada.conversation(group.id).unwrap();
        assert!(after.last_active_at >= before);
        assert_eq!(after.last_active_at, sent.message.created_at);
        assert_eq!(after.messages.len(), 2);
        assert_eq!(after.messages[0].text, "hello team");
        let reply = &after.messages[1];
        assert!(reply.is_generated);
        assert_eq!(reply.sender_id, UserId::from("usr-001"));
        assert_eq!(reply.text, "Hi all");

        let (history, label) = generator.calls().remove(0);
        assert_eq!(label, "Assistant");
        assert_eq!(history.last().unwrap().sender, "A");
    }

    #[tokio::test]
    async fn test_generator_failure_appends_fallback() {
        let source = Arc::new(MemorySource::new());
        let ada = signed_in(&source, &Arc::new(ScriptedGenerator::failing()), "Ada").await;
        let group = ada.create_group("Ops").await.unwrap();

        let sent = ada.send_message(group.id, "ping").await.unwrap().unwrap();
        let reply = sent.reply_task.unwrap().await.unwrap().unwrap();

        assert_eq!(reply.text, REPLY_FALLBACK_TEXT);
        let stored = source.list_messages(group.id).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].text, REPLY_FALLBACK_TEXT);
    }

    #[tokio::test]
    async fn test_open_conversation_merges_history() {
        let source = Arc::new(MemorySource::new());
        let ada = signed_in(&source, &quiet(), "Ada").await;
        let dm = ada.create_dm(&UserId::from("usr-bob")).await.unwrap();

        // Written by the other side, not yet seen by this client.
        let incoming = Message::new(dm.id, UserId::from("usr-bob"), "you there?");
        source.insert_message(&incoming).await.unwrap();

        let opened = ada.open_conversation(dm.id).await.unwrap();
        assert_eq!(opened.messages, vec![incoming.clone()]);
        assert_eq!(ada.active_conversation().map(|c| c.id), Some(dm.id));

        assert_eq!(ada.ingest_message(incoming), Ingest::Duplicate);
        assert_eq!(ada.conversation(dm.id).unwrap().messages.len(), 1);

        assert!(matches!(
            ada.open_conversation(ConversationId::new()).await,
            Err(SyncError::UnknownConversation(_))
        ));
    }
}
