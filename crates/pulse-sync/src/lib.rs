//! # pulse-sync
//!
//! Client-side sync core for Pulse. A [`SyncEngine`] keeps an in-memory view
//! of the signed-in user's identity, the user directory and the conversations
//! they have joined, and reconciles it with a [`SourceOfTruth`] by wholesale
//! refetch. Writes go straight to the source; a change feed, an optional
//! poller and post-write refreshes bring the view back in line.
//!
//! Groups, and DMs that include the assistant, get an automatic reply from a
//! [`ReplyGenerator`] after every send.

pub mod commands;
pub mod config;
pub mod context;
pub mod directory;
pub mod engine;
pub mod error;
pub mod feed;
pub mod gemini;
pub mod reply;
pub mod session;
pub mod source;
pub mod state;
pub mod store;

#[cfg(test)]
mod testing;

pub use commands::{JoinOutcome, Sent};
pub use config::SyncConfig;
pub use context::SyncContext;
pub use directory::Directory;
pub use engine::{RefreshOutcome, SyncEngine};
pub use error::{ReplyError, Result, SourceError, SyncError};
pub use gemini::GeminiReplyGenerator;
pub use reply::{HistoryEntry, ReplyGenerator};
pub use session::{DatabaseSession, MemorySession, SessionStore};
pub use source::{ChangeEvent, LocalSource, MemorySource, SourceOfTruth, Table};
pub use store::{ConversationStore, Ingest};
