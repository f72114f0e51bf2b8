//! The sync engine: owns client state and reconciles it with the source.
//!
//! Every refresh refetches identities and conversations concurrently and
//! swaps the result in wholesale. Refreshes may overlap (a burst of change
//! notifications, a poll tick, a post-write refresh), so each one takes a
//! sequence number when it is issued and its result is only applied if no
//! later-issued refresh has been applied first.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pulse_shared::{Conversation, ConversationId, Identity, UserId};
use tracing::{debug, warn};

use crate::config::SyncConfig;
use crate::context::SyncContext;
use crate::error::{Result, SyncError};
use crate::state::ClientState;

/// What a call to [`SyncEngine::refresh`] did to the client state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied {
        identities: usize,
        conversations: usize,
    },
    /// A refresh issued later was applied first; this result was dropped.
    Superseded,
    /// Nobody is signed in (or the identity changed mid-flight).
    SignedOut,
}

/// Handle to the client. Clones share the same state.
#[derive(Clone)]
pub struct SyncEngine {
    ctx: SyncContext,
    state: Arc<Mutex<ClientState>>,
    refresh_seq: Arc<AtomicU64>,
}

impl SyncEngine {
    pub fn new(ctx: SyncContext) -> Self {
        Self {
            ctx,
            state: Arc::new(Mutex::new(ClientState::new())),
            refresh_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    pub fn config(&self) -> &SyncConfig {
        &self.ctx.config
    }

    /// Lock the client state. State is only ever replaced wholesale under
    /// the lock, so a poisoned guard still holds a consistent value.
    pub(crate) fn state(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Highest sequence number issued so far.
    pub(crate) fn issued_refreshes(&self) -> u64 {
        self.refresh_seq.load(Ordering::SeqCst)
    }

    // -- Accessors --

    pub fn identity(&self) -> Option<Identity> {
        self.state().identity.clone()
    }

    pub(crate) fn require_identity(&self) -> Result<Identity> {
        self.identity().ok_or(SyncError::NoIdentity)
    }

    /// Visible conversations, most recently active first.
    pub fn conversations(&self) -> Vec<Conversation> {
        self.state().conversations.list()
    }

    pub fn conversation(&self, id: ConversationId) -> Option<Conversation> {
        self.state().conversations.get(id).cloned()
    }

    pub fn active_conversation(&self) -> Option<Conversation> {
        let state = self.state();
        state.active.and_then(|id| state.conversations.get(id).cloned())
    }

    pub(crate) fn set_active(&self, id: ConversationId) {
        self.state().active = Some(id);
    }

    /// Every known identity, ordered by display name.
    pub fn directory(&self) -> Vec<Identity> {
        self.state().directory.list_all()
    }

    pub fn display_name(&self, id: &UserId) -> Option<String> {
        self.state().directory.display_name(id).map(str::to_string)
    }

    // -- Reconciliation --

    /// Refetch identities and conversations and replace the cached state.
    ///
    /// On failure the state is left untouched and the error returned; the
    /// next refresh (change notification, poll tick or user action) retries.
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        let Some(viewer) = self.identity() else {
            return Ok(RefreshOutcome::SignedOut);
        };
        let seq = self.refresh_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let source = &self.ctx.source;
        let (identities, conversations) =
            tokio::try_join!(source.list_identities(), source.list_conversations())?;

        let mut state = self.state();
        if seq <= state.applied_refresh {
            debug!(seq, applied = state.applied_refresh, "Discarding superseded refresh");
            return Ok(RefreshOutcome::Superseded);
        }
        if state.identity.as_ref().map(|i| &i.id) != Some(&viewer.id) {
            debug!(seq, "Identity changed during refresh, discarding");
            return Ok(RefreshOutcome::SignedOut);
        }

        state.applied_refresh = seq;
        state.directory.replace_all(identities);

        let ClientState {
            directory,
            conversations: store,
            ..
        } = &mut *state;
        let visible = store.replace_visible(&viewer.id, conversations, directory);

        debug!(seq, identities = directory.len(), conversations = visible, "Refresh applied");
        Ok(RefreshOutcome::Applied {
            identities: directory.len(),
            conversations: visible,
        })
    }

    /// Refresh after a successful write. The write already succeeded, so a
    /// failed refetch is only logged.
    pub(crate) async fn refresh_after_write(&self) {
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "Refresh after write failed");
        }
    }
}
