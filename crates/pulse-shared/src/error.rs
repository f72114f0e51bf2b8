use thiserror::Error;

/// Failure to read a domain value back from its stored text form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown conversation kind: {0}")]
    ConversationKind(String),

    #[error("Unknown participant status: {0}")]
    ParticipantStatus(String),

    #[error("Invalid id: {0}")]
    Id(String),
}
