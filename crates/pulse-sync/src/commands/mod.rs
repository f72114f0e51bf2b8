//! Operations the presentation layer invokes on a [`SyncEngine`](crate::SyncEngine).
//!
//! Each sub-module adds one `impl SyncEngine` block, grouped by domain.

pub mod identity;
pub mod membership;
pub mod messaging;
pub mod users;

pub use membership::JoinOutcome;
pub use messaging::Sent;
