use pulse_shared::{Identity, UserId};
use tracing::{debug, warn};

use crate::engine::SyncEngine;

impl SyncEngine {
    /// Identity for `user_id`, registering a placeholder if nobody has
    /// claimed the id yet. Best effort: source failures are logged and the
    /// placeholder is still returned.
    pub async fn ensure_identity(&self, user_id: &UserId) -> Identity {
        if let Some(known) = self.state().directory.get(user_id).cloned() {
            return known;
        }

        let source = &self.context().source;
        match source.get_identity(user_id).await {
            Ok(Some(found)) => {
                self.state().directory.upsert(found.clone());
                return found;
            }
            Ok(None) => {}
            Err(e) => warn!(user = %user_id, error = %e, "Identity lookup failed"),
        }

        let placeholder = Identity::placeholder(user_id);
        match source.insert_identity(&placeholder).await {
            Ok(()) => debug!(user = %user_id, "Registered placeholder identity"),
            Err(e) => warn!(user = %user_id, error = %e, "Failed to register placeholder identity"),
        }
        self.state().directory.upsert(placeholder.clone());
        placeholder
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::source::{MemorySource, SourceOfTruth};
    use crate::testing::{signed_in, ScriptedGenerator};

    use super::*;

    #[tokio::test]
    async fn test_unknown_id_gets_placeholder() {
        let source = Arc::new(MemorySource::new());
        let generator = Arc::new(ScriptedGenerator::replying(std::iter::empty()));
        let ada = signed_in(&source, &generator, "Ada").await;

        let ghost = UserId::from("usr-ghost");
        let identity = ada.ensure_identity(&ghost).await;

        assert_eq!(identity.display_name, "User usr-ghost");
        assert_eq!(identity.avatar_ref, "https://picsum.photos/seed/usr-ghost/200");
        assert_eq!(source.get_identity(&ghost).await.unwrap(), Some(identity.clone()));
        assert_eq!(ada.display_name(&ghost).as_deref(), Some("User usr-ghost"));

        // Second call is a cache hit and registers nothing new.
        assert_eq!(ada.ensure_identity(&ghost).await, identity);
        assert_eq!(source.list_identities().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_existing_identity_is_returned() {
        let source = Arc::new(MemorySource::new());
        let generator = Arc::new(ScriptedGenerator::replying(std::iter::empty()));
        let bob = Identity::generate("Bob");
        source.insert_identity(&bob).await.unwrap();
        let ada = signed_in(&source, &generator, "Ada").await;

        assert_eq!(ada.ensure_identity(&bob.id).await, bob);
    }

    #[tokio::test]
    async fn test_outage_still_yields_placeholder() {
        let source = Arc::new(MemorySource::new());
        let generator = Arc::new(ScriptedGenerator::replying(std::iter::empty()));
        let ada = signed_in(&source, &generator, "Ada").await;
        source.set_online(false);

        let ghost = UserId::from("usr-ghost");
        assert_eq!(ada.ensure_identity(&ghost).await, Identity::placeholder(&ghost));
    }
}
