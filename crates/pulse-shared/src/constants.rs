/// Application name
pub const APP_NAME: &str = "Pulse";

/// Prefix of every client-generated user id
pub const USER_ID_PREFIX: &str = "usr-";

/// Number of random base-36 characters after the prefix (~41 bits)
pub const USER_ID_RANDOM_LEN: usize = 8;

/// Avatar references are derived from a seed through this service
pub const AVATAR_BASE_URL: &str = "https://picsum.photos/seed";

/// Display-name prefix of identities synthesized for unknown user ids
pub const PLACEHOLDER_NAME_PREFIX: &str = "User ";

/// Id of the designated assistant participant
pub const DEFAULT_ASSISTANT_ID: &str = "usr-001";

/// Label the assistant speaks as
pub const DEFAULT_ASSISTANT_LABEL: &str = "Assistant";

/// Number of most recent messages handed to the reply generator
pub const REPLY_CONTEXT_WINDOW: usize = 5;

/// Appended in place of a reply when the generator fails
pub const REPLY_FALLBACK_TEXT: &str = "Thinking... (error)";

/// Sender label used when a sender is missing from the directory
pub const UNKNOWN_SENDER_LABEL: &str = "User";

/// Name given to groups ingested without one
pub const UNTITLED_GROUP_NAME: &str = "Untitled group";
