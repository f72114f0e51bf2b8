use pulse_shared::{Conversation, ConversationId, Participant, ParticipantStatus, UserId};
use tracing::{debug, info, warn};

use crate::engine::SyncEngine;
use crate::error::{Result, SourceError, SyncError};

/// Result of [`SyncEngine::request_join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// A pending membership row was created.
    Requested,
    /// The user already has a row (pending or joined); nothing changed.
    AlreadyListed,
}

impl SyncEngine {
    /// Cached DM between the signed-in user and `other`.
    pub fn find_dm(&self, other: &UserId) -> Option<Conversation> {
        let me = self.identity()?;
        self.state().conversations.find_dm(&me.id, other).cloned()
    }

    /// Open the DM with `other`, creating it if none is cached.
    pub async fn create_dm(&self, other: &UserId) -> Result<Conversation> {
        let me = self.require_identity()?;
        let other = UserId::new(other.as_str().trim());
        if other.as_str().is_empty() {
            return Err(SyncError::InvalidInput("user id is empty".into()));
        }
        if other == me.id {
            return Err(SyncError::InvalidInput("cannot start a DM with yourself".into()));
        }

        if let Some(existing) = self.find_dm(&other) {
            debug!(conversation = %existing.id, "Reusing existing DM");
            self.set_active(existing.id);
            return Ok(existing);
        }

        self.ensure_identity(&other).await;

        let conversation = Conversation::new_dm(me.id.clone(), other.clone());
        self.context()
            .source
            .insert_conversation(&conversation)
            .await?;
        info!(conversation = %conversation.id, with = %other, "DM created");

        self.set_active(conversation.id);
        self.refresh_after_write().await;
        Ok(self.conversation(conversation.id).unwrap_or(conversation))
    }

    /// Create a group with the signed-in user as its only (admin) member.
    pub async fn create_group(&self, name: &str) -> Result<Conversation> {
        let me = self.require_identity()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(SyncError::InvalidInput("group name is empty".into()));
        }

        let conversation = Conversation::new_group(me.id.clone(), name);
        self.context()
            .source
            .insert_conversation(&conversation)
            .await?;
        info!(conversation = %conversation.id, name = %name, "Group created");

        self.set_active(conversation.id);
        self.refresh_after_write().await;
        Ok(self.conversation(conversation.id).unwrap_or(conversation))
    }

    /// Ask to join a group. Asking twice, or asking to join a group one is
    /// already in, changes nothing.
    pub async fn request_join(&self, conversation_id: ConversationId) -> Result<JoinOutcome> {
        let me = self.require_identity()?;
        let request = Participant::pending(me.id.clone());

        let outcome = match self
            .context()
            .source
            .insert_participant(conversation_id, &request)
            .await
        {
            Ok(()) => {
                info!(conversation = %conversation_id, user = %me.id, "Join requested");
                JoinOutcome::Requested
            }
            Err(SourceError::Conflict(_)) => {
                debug!(conversation = %conversation_id, user = %me.id, "Already listed, join request ignored");
                JoinOutcome::AlreadyListed
            }
            Err(SourceError::NotFound(_)) => {
                return Err(SyncError::UnknownConversation(conversation_id));
            }
            Err(e) => return Err(e.into()),
        };

        if outcome == JoinOutcome::Requested {
            self.refresh_after_write().await;
        }
        Ok(outcome)
    }

    /// Accept or reject `requester`'s pending request. Only a joined admin
    /// of the conversation may do this. Returns whether a row was changed.
    pub async fn resolve_request(
        &self,
        conversation_id: ConversationId,
        requester: &UserId,
        accept: bool,
    ) -> Result<bool> {
        let me = self.require_identity()?;
        let conversation = self
            .conversation(conversation_id)
            .ok_or(SyncError::UnknownConversation(conversation_id))?;
        if !conversation.is_admin(&me.id) {
            return Err(SyncError::NotAdmin);
        }
        if requester == &me.id {
            return Err(SyncError::InvalidInput("cannot resolve your own membership".into()));
        }

        let source = &self.context().source;
        let changed = if accept {
            source
                .update_participant_status(conversation_id, requester, ParticipantStatus::Joined)
                .await?
        } else {
            source.delete_participant(conversation_id, requester).await?
        };

        if changed == 0 {
            warn!(conversation = %conversation_id, user = %requester, "No membership row to resolve");
            return Ok(false);
        }

        info!(
            conversation = %conversation_id,
            user = %requester,
            accepted = accept,
            "Join request resolved"
        );
        self.refresh_after_write().await;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pulse_shared::ConversationKind;

    use super::*;
    use crate::source::{MemorySource, SourceOfTruth};
    use crate::testing::{signed_in, ScriptedGenerator};

    fn fixtures() -> (Arc<MemorySource>, Arc<ScriptedGenerator>) {
        (
            Arc::new(MemorySource::new()),
            Arc::new(ScriptedGenerator::replying(std::iter::empty())),
        )
    }

    async fn stored(source: &MemorySource, id: ConversationId) -> Conversation {
        source
            .list_conversations()
            .await
            .unwrap()
            .into_iter()
            .find(|c| c.id == id)
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_dm_is_reused() {
        let (source, generator) = fixtures();
        let ada = signed_in(&source, &generator, "Ada").await;
        let bob = signed_in(&source, &generator, "Bob").await;
        let bob_id = bob.identity().unwrap().id;

        let first = ada.create_dm(&bob_id).await.unwrap();
        let second = ada.create_dm(&bob_id).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.kind, ConversationKind::Dm);
        assert!(first.participants.iter().all(|p| p.is_joined() && !p.is_admin));
        assert_eq!(source.list_conversations().await.unwrap().len(), 1);
        assert_eq!(ada.active_conversation().map(|c| c.id), Some(first.id));

        bob.refresh().await.unwrap();
        assert_eq!(bob.find_dm(&ada.identity().unwrap().id).map(|c| c.id), Some(first.id));
    }

    #[tokio::test]
    async fn test_dm_with_unregistered_user() {
        let (source, generator) = fixtures();
        let ada = signed_in(&source, &generator, "Ada").await;
        let ghost = UserId::from("usr-ghost");

        let dm = ada.create_dm(&ghost).await.unwrap();

        let counterpart = dm.counterpart(&ada.identity().unwrap().id).unwrap();
        assert_eq!(counterpart.user_id, ghost);
        assert_eq!(
            counterpart.user.as_ref().map(|u| u.display_name.as_str()),
            Some("User usr-ghost")
        );
    }

    #[tokio::test]
    async fn test_dm_input_is_validated() {
        let (source, generator) = fixtures();
        let ada = signed_in(&source, &generator, "Ada").await;
        let me = ada.identity().unwrap().id;

        assert!(matches!(ada.create_dm(&me).await, Err(SyncError::InvalidInput(_))));
        assert!(matches!(
            ada.create_dm(&UserId::from("  ")).await,
            Err(SyncError::InvalidInput(_))
        ));
        assert!(source.list_conversations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_group() {
        let (source, generator) = fixtures();
        let ada = signed_in(&source, &generator, "Ada").await;
        let me = ada.identity().unwrap().id;

        let group = ada.create_group("  Ops ").await.unwrap();

        assert_eq!(group.name.as_deref(), Some("Ops"));
        assert_eq!(group.participants.len(), 1);
        assert!(group.is_admin(&me));
        assert!(matches!(ada.create_group(" ").await, Err(SyncError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_join_request_is_idempotent() {
        let (source, generator) = fixtures();
        let ada = signed_in(&source, &generator, "Ada").await;
        let bob = signed_in(&source, &generator, "Bob").await;
        let group = ada.create_group("Ops").await.unwrap();

        assert_eq!(bob.request_join(group.id).await.unwrap(), JoinOutcome::Requested);
        assert_eq!(bob.request_join(group.id).await.unwrap(), JoinOutcome::AlreadyListed);
        assert_eq!(stored(&source, group.id).await.participants.len(), 2);

        // Pending members do not see the group yet.
        assert!(bob.conversation(group.id).is_none());

        // The creator is already listed too.
        assert_eq!(ada.request_join(group.id).await.unwrap(), JoinOutcome::AlreadyListed);

        assert!(matches!(
            bob.request_join(ConversationId::new()).await,
            Err(SyncError::UnknownConversation(_))
        ));
    }

    #[tokio::test]
    async fn test_accept_keeps_admin_flag() {
        let (source, generator) = fixtures();
        let ada = signed_in(&source, &generator, "Ada").await;
        let bob = signed_in(&source, &generator, "Bob").await;
        let bob_id = bob.identity().unwrap().id;
        let group = ada.create_group("Ops").await.unwrap();
        bob.request_join(group.id).await.unwrap();
        ada.refresh().await.unwrap();

        assert!(ada.resolve_request(group.id, &bob_id, true).await.unwrap());

        let row = stored(&source, group.id).await;
        let member = row.participant(&bob_id).unwrap();
        assert_eq!(member.status, ParticipantStatus::Joined);
        assert!(!member.is_admin);

        bob.refresh().await.unwrap();
        assert!(bob.conversation(group.id).is_some());
    }

    #[tokio::test]
    async fn test_reject_removes_row() {
        let (source, generator) = fixtures();
        let ada = signed_in(&source, &generator, "Ada").await;
        let bob = signed_in(&source, &generator, "Bob").await;
        let bob_id = bob.identity().unwrap().id;
        let group = ada.create_group("Ops").await.unwrap();
        bob.request_join(group.id).await.unwrap();

        assert!(ada.resolve_request(group.id, &bob_id, false).await.unwrap());
        assert_eq!(stored(&source, group.id).await.participants.len(), 1);
        assert!(!ada.resolve_request(group.id, &bob_id, false).await.unwrap());
    }

    #[tokio::test]
    async fn test_only_admins_resolve() {
        let (source, generator) = fixtures();
        let ada = signed_in(&source, &generator, "Ada").await;
        let bob = signed_in(&source, &generator, "Bob").await;
        let cy = signed_in(&source, &generator, "Cy").await;
        let cy_id = cy.identity().unwrap().id;
        let bob_id = bob.identity().unwrap().id;

        let group = ada.create_group("Ops").await.unwrap();
        bob.request_join(group.id).await.unwrap();
        ada.refresh().await.unwrap();
        ada.resolve_request(group.id, &bob_id, true).await.unwrap();
        cy.request_join(group.id).await.unwrap();
        bob.refresh().await.unwrap();

        assert!(matches!(
            bob.resolve_request(group.id, &cy_id, true).await,
            Err(SyncError::NotAdmin)
        ));
        assert!(matches!(
            cy.resolve_request(group.id, &cy_id, true).await,
            Err(SyncError::UnknownConversation(_))
        ));
        let row = stored(&source, group.id).await;
        assert_eq!(row.participant(&cy_id).unwrap().status, ParticipantStatus::Pending);
    }
}
