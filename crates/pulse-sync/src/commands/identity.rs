use pulse_shared::Identity;
use tracing::{info, warn};

use crate::engine::SyncEngine;
use crate::error::{Result, SyncError};

impl SyncEngine {
    /// Create a fresh identity for `display_name`, register it, persist it
    /// for the next run and sign in as it.
    pub async fn login(&self, display_name: &str) -> Result<Identity> {
        let name = display_name.trim();
        if name.is_empty() {
            return Err(SyncError::InvalidInput("display name is empty".into()));
        }

        let identity = Identity::generate(name);

        if let Err(e) = self.context().source.insert_identity(&identity).await {
            warn!(user = %identity.id, error = %e, "Failed to register identity, continuing locally");
        }

        match serde_json::to_string(&identity) {
            Ok(record) => {
                if let Err(e) = self.context().session.save(&record) {
                    warn!(error = %e, "Failed to persist session");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize identity"),
        }

        {
            let seq = self.issued_refreshes();
            let mut state = self.state();
            state.reset(seq);
            state.directory.upsert(identity.clone());
            state.identity = Some(identity.clone());
        }

        info!(user = %identity.id, name = %identity.display_name, "Logged in");
        self.refresh_after_write().await;

        Ok(identity)
    }

    /// Sign back in as the persisted identity, if there is a usable one.
    /// A record that does not parse is cleared.
    pub fn restore(&self) -> Option<Identity> {
        let record = match self.context().session.load() {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session");
                return None;
            }
        };

        let identity: Identity = match serde_json::from_str(&record) {
            Ok(identity) => identity,
            Err(e) => {
                warn!(error = %e, "Discarding malformed persisted identity");
                if let Err(e) = self.context().session.clear() {
                    warn!(error = %e, "Failed to clear persisted session");
                }
                return None;
            }
        };

        {
            let seq = self.issued_refreshes();
            let mut state = self.state();
            state.reset(seq);
            state.directory.upsert(identity.clone());
            state.identity = Some(identity.clone());
        }

        info!(user = %identity.id, "Session restored");
        Some(identity)
    }

    /// Forget the signed-in identity, locally and in the persisted session.
    /// In-memory state is dropped even if clearing the record fails.
    pub fn logout(&self) -> Result<()> {
        let seq = self.issued_refreshes();
        let previous = {
            let mut state = self.state();
            let previous = state.identity.take();
            state.reset(seq);
            previous
        };

        if let Some(identity) = previous {
            info!(user = %identity.id, "Logged out");
        }

        self.context().session.clear()?;
        Ok(())
    }
}
