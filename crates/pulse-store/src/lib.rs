//! # pulse-store
//!
//! Local storage for Pulse's local-only mode, backed by SQLite.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for identities,
//! conversations, participants and messages, plus a small key/value table
//! used to persist the signed-in identity between sessions.

pub mod conversations;
pub mod database;
pub mod identities;
pub mod kv;
pub mod messages;
pub mod migrations;
pub mod participants;

mod error;
mod row;

pub use database::Database;
pub use error::{Result, StoreError};
