use std::sync::{Arc, Mutex};

use pulse_store::Database;

use crate::config::SyncConfig;
use crate::reply::ReplyGenerator;
use crate::session::{DatabaseSession, SessionStore};
use crate::source::{LocalSource, SourceOfTruth};

/// The services an engine is wired to. Cheap to clone.
#[derive(Clone)]
pub struct SyncContext {
    pub source: Arc<dyn SourceOfTruth>,
    pub generator: Arc<dyn ReplyGenerator>,
    pub session: Arc<dyn SessionStore>,
    pub config: SyncConfig,
}

impl SyncContext {
    pub fn new(
        source: Arc<dyn SourceOfTruth>,
        generator: Arc<dyn ReplyGenerator>,
        session: Arc<dyn SessionStore>,
        config: SyncConfig,
    ) -> Self {
        Self {
            source,
            generator,
            session,
            config,
        }
    }

    /// Local-only mode: data and session both live in one SQLite database.
    pub fn local(
        db: Database,
        generator: Arc<dyn ReplyGenerator>,
        config: SyncConfig,
    ) -> Self {
        let db = Arc::new(Mutex::new(db));
        Self {
            source: Arc::new(LocalSource::new(db.clone())),
            generator,
            session: Arc::new(DatabaseSession::new(db)),
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::engine::SyncEngine;
    use crate::testing::{test_config, ScriptedGenerator};

    #[tokio::test]
    async fn test_local_mode_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(ScriptedGenerator::replying(["noted"]));

        let engine = SyncEngine::new(SyncContext::local(
            Database::open_in_dir(dir.path()).unwrap(),
            generator.clone(),
            test_config(),
        ));
        let me = engine.login("Ada").await.unwrap();
        let group = engine.create_group("Ops").await.unwrap();
        let sent = engine.send_message(group.id, "hello").await.unwrap().unwrap();
        sent.reply_task.unwrap().await.unwrap().unwrap();
        drop(engine);

        // A second run on the same file signs back in and sees the history.
        let engine = SyncEngine::new(SyncContext::local(
            Database::open_in_dir(dir.path()).unwrap(),
            generator,
            test_config(),
        ));
        assert_eq!(engine.restore(), Some(me));
        engine.refresh().await.unwrap();

        let texts: Vec<_> = engine
            .conversation(group.id)
            .unwrap()
            .messages
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["hello", "noted"]);
    }
}
