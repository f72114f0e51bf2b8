//! Fixtures shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::SyncConfig;
use crate::context::SyncContext;
use crate::engine::SyncEngine;
use crate::error::ReplyError;
use crate::reply::{HistoryEntry, ReplyGenerator};
use crate::session::MemorySession;
use crate::source::MemorySource;

type Call = (Vec<HistoryEntry>, String);

/// Generator answering from a queue of canned replies and recording every
/// request. An exhausted queue answers "ok".
pub(crate) struct ScriptedGenerator {
    replies: Mutex<VecDeque<String>>,
    fail: bool,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedGenerator {
    pub(crate) fn replying<'a>(replies: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(String::from).collect()),
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::replying(std::iter::empty())
        }
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplyGenerator for ScriptedGenerator {
    async fn generate_reply(
        &self,
        history: &[HistoryEntry],
        label: &str,
    ) -> Result<String, ReplyError> {
        self.calls
            .lock()
            .unwrap()
            .push((history.to_vec(), label.to_string()));
        if self.fail {
            return Err(ReplyError::Failed("scripted failure".into()));
        }
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "ok".to_string()))
    }
}

pub(crate) fn test_config() -> SyncConfig {
    SyncConfig {
        debounce: Duration::from_millis(50),
        ..SyncConfig::default()
    }
}

/// A client on `source` with its own session and the given generator.
pub(crate) fn client(source: &Arc<MemorySource>, generator: &Arc<ScriptedGenerator>) -> SyncEngine {
    client_with_session(source, generator, Arc::new(MemorySession::new()))
}

pub(crate) fn client_with_session(
    source: &Arc<MemorySource>,
    generator: &Arc<ScriptedGenerator>,
    session: Arc<MemorySession>,
) -> SyncEngine {
    SyncEngine::new(SyncContext::new(
        source.clone(),
        generator.clone(),
        session,
        test_config(),
    ))
}

/// A client already signed in as `name`.
pub(crate) async fn signed_in(
    source: &Arc<MemorySource>,
    generator: &Arc<ScriptedGenerator>,
    name: &str,
) -> SyncEngine {
    let engine = client(source, generator);
    engine.login(name).await.unwrap();
    engine
}
