//! Client state shared by every engine handle.
//!
//! The [`ClientState`] struct is wrapped in `Arc<Mutex<>>` inside
//! [`SyncEngine`](crate::SyncEngine). The lock is only ever held for
//! synchronous reads and swaps, never across an await point.

use pulse_shared::{ConversationId, Identity};

use crate::directory::Directory;
use crate::store::ConversationStore;

/// Everything the presentation layer reads.
#[derive(Debug, Default)]
pub struct ClientState {
    /// The signed-in user. `None` until login or restore.
    pub identity: Option<Identity>,

    /// Every known identity, refreshed with the conversations.
    pub directory: Directory,

    /// Conversations the signed-in user has joined.
    pub conversations: ConversationStore,

    /// Conversation currently shown to the user.
    pub active: Option<ConversationId>,

    /// Sequence number of the last refresh whose result was applied.
    /// Responses carrying a lower number are discarded.
    pub applied_refresh: u64,
}

impl ClientState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the signed-in user and everything fetched on their behalf.
    /// `applied_refresh` is raised to `seq` so in-flight refreshes issued
    /// before this point are dropped.
    pub fn reset(&mut self, seq: u64) {
        self.identity = None;
        self.directory.clear();
        self.conversations.clear();
        self.active = None;
        self.applied_refresh = self.applied_refresh.max(seq);
    }
}
