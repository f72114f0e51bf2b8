//! Persistence of the signed-in identity between runs.
//!
//! The record is opaque text (JSON of an [`Identity`](pulse_shared::Identity));
//! parsing and fail-soft handling of corrupt records live in the identity
//! commands.

use std::sync::{Arc, Mutex};

use pulse_store::Database;

use crate::error::SourceError;

/// Key the identity record is stored under.
pub const SESSION_IDENTITY_KEY: &str = "session.identity";

pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<String>, SourceError>;
    fn save(&self, record: &str) -> Result<(), SourceError>;
    fn clear(&self) -> Result<(), SourceError>;
}

/// Session record kept in the local database's key/value table.
pub struct DatabaseSession {
    db: Arc<Mutex<Database>>,
}

impl DatabaseSession {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    fn with_db<T>(
        &self,
        f: impl FnOnce(&Database) -> pulse_store::Result<T>,
    ) -> Result<T, SourceError> {
        let guard = self
            .db
            .lock()
            .map_err(|_| SourceError::Unavailable("database lock poisoned".into()))?;
        Ok(f(&guard)?)
    }
}

impl SessionStore for DatabaseSession {
    fn load(&self) -> Result<Option<String>, SourceError> {
        self.with_db(|db| db.get_value(SESSION_IDENTITY_KEY))
    }

    fn save(&self, record: &str) -> Result<(), SourceError> {
        self.with_db(|db| db.put_value(SESSION_IDENTITY_KEY, record))
    }

    fn clear(&self) -> Result<(), SourceError> {
        self.with_db(|db| db.delete_value(SESSION_IDENTITY_KEY))
            .map(|_| ())
    }
}

/// Session record that lives only as long as the process.
#[derive(Default)]
pub struct MemorySession {
    record: Mutex<Option<String>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing record (e.g. a corrupt one).
    pub fn with_record(record: impl Into<String>) -> Self {
        Self {
            record: Mutex::new(Some(record.into())),
        }
    }
}

impl SessionStore for MemorySession {
    fn load(&self) -> Result<Option<String>, SourceError> {
        self.record
            .lock()
            .map(|r| r.clone())
            .map_err(|_| SourceError::Unavailable("session lock poisoned".into()))
    }

    fn save(&self, record: &str) -> Result<(), SourceError> {
        let mut guard = self
            .record
            .lock()
            .map_err(|_| SourceError::Unavailable("session lock poisoned".into()))?;
        *guard = Some(record.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), SourceError> {
        let mut guard = self
            .record
            .lock()
            .map_err(|_| SourceError::Unavailable("session lock poisoned".into()))?;
        *guard = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_session_round_trip() {
        let db = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
        let session = DatabaseSession::new(db);

        assert_eq!(session.load().unwrap(), None);
        session.save("{}").unwrap();
        assert_eq!(session.load().unwrap().as_deref(), Some("{}"));
        session.clear().unwrap();
        assert_eq!(session.load().unwrap(), None);
    }
}
