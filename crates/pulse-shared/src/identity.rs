use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{AVATAR_BASE_URL, PLACEHOLDER_NAME_PREFIX, USER_ID_PREFIX, USER_ID_RANDOM_LEN};
use crate::types::UserId;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// A user's identity. Created once at login and never mutated.
/// No password, no email: the random id is the only handle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub id: UserId,
    pub display_name: String,
    pub avatar_ref: String,
}

impl Identity {
    /// Generate a fresh identity with a random id
    pub fn generate(display_name: &str) -> Self {
        Self {
            id: generate_user_id(),
            display_name: display_name.to_string(),
            avatar_ref: avatar_ref_for(display_name),
        }
    }

    /// Stand-in for a user id nobody has registered yet
    pub fn placeholder(id: &UserId) -> Self {
        Self {
            id: id.clone(),
            display_name: format!("{PLACEHOLDER_NAME_PREFIX}{id}"),
            avatar_ref: avatar_ref_for(id.as_str()),
        }
    }
}

/// `usr-` followed by random base-36 characters
pub fn generate_user_id() -> UserId {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..USER_ID_RANDOM_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    UserId(format!("{USER_ID_PREFIX}{suffix}"))
}

/// Deterministic avatar reference for a seed (name or id)
pub fn avatar_ref_for(seed: &str) -> String {
    format!("{AVATAR_BASE_URL}/{seed}/200")
}
