use pulse_shared::ConversationId;
use pulse_store::StoreError;
use thiserror::Error;

/// Failures reported by a [`SourceOfTruth`](crate::source::SourceOfTruth).
#[derive(Error, Debug)]
pub enum SourceError {
    /// The remote (or local substrate) could not be reached.
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A uniqueness rule rejected the write.
    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StoreError> for SourceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => Self::NotFound("record".into()),
            StoreError::Conflict => Self::Conflict("record".into()),
            other => Self::Store(other),
        }
    }
}

/// Failures of the reply generator. Never surfaced past the reply trigger.
#[derive(Error, Debug)]
pub enum ReplyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Generator returned status {0}")]
    Status(u16),

    #[error("Generator failed: {0}")]
    Failed(String),
}

/// Errors returned by [`SyncEngine`](crate::SyncEngine) operations.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No identity signed in")]
    NoIdentity,

    #[error("Only a group admin can do this")]
    NotAdmin,

    #[error("Unknown conversation: {0}")]
    UnknownConversation(ConversationId),
}

pub type Result<T> = std::result::Result<T, SyncError>;
