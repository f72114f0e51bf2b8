//! # pulse-shared
//!
//! Domain types shared by every Pulse crate: identifiers, user identities,
//! conversations with their participants and messages, and the constants the
//! sync core agrees on.

pub mod constants;
pub mod conversation;
pub mod error;
pub mod identity;
pub mod types;

pub use conversation::{Conversation, Message, Participant};
pub use error::ParseError;
pub use identity::Identity;
pub use types::{ConversationId, ConversationKind, MessageId, ParticipantStatus, UserId};
