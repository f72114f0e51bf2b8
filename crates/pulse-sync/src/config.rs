//! Client configuration loaded from environment variables.
//!
//! All settings have defaults so the client runs in local-only mode with
//! zero configuration.

use std::path::PathBuf;
use std::time::Duration;

use pulse_shared::constants::{DEFAULT_ASSISTANT_ID, DEFAULT_ASSISTANT_LABEL};
use pulse_shared::UserId;

/// Sync core configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Directory holding `pulse.db`.
    /// Env: `PULSE_DATA_DIR`
    /// Default: platform data directory.
    pub data_dir: Option<PathBuf>,

    /// Quiet period used to collapse bursts of change notifications into
    /// a single refresh.
    /// Env: `PULSE_DEBOUNCE_MS`
    /// Default: 250 ms
    pub debounce: Duration,

    /// Periodic refetch on top of the change feed.
    /// Env: `PULSE_POLL_INTERVAL_SECS` (0 disables)
    /// Default: disabled
    pub poll_interval: Option<Duration>,

    /// Participant whose presence in a DM enables auto-replies, and the
    /// author of generated messages.
    /// Env: `PULSE_ASSISTANT_ID`
    /// Default: `usr-001`
    pub assistant_id: UserId,

    /// Name the generator is asked to speak as.
    /// Env: `PULSE_ASSISTANT_LABEL`
    /// Default: `Assistant`
    pub assistant_label: String,

    // -- Reply generator --

    /// Env: `GEMINI_API_KEY`, then `API_KEY`
    /// Default: none (generator answers with a "not configured" notice).
    pub gemini_api_key: Option<String>,

    /// Env: `GEMINI_MODEL`
    pub gemini_model: String,

    /// Env: `PULSE_REPLY_TIMEOUT_SECS`
    /// Default: 30 s
    pub reply_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            debounce: Duration::from_millis(250),
            poll_interval: None,
            assistant_id: UserId::from(DEFAULT_ASSISTANT_ID),
            assistant_label: DEFAULT_ASSISTANT_LABEL.to_string(),
            gemini_api_key: None,
            gemini_model: "gemini-3-flash-preview".to_string(),
            reply_timeout: Duration::from_secs(30),
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("PULSE_DATA_DIR").filter(|d| !d.is_empty()) {
            config.data_dir = Some(PathBuf::from(dir));
        }

        if let Some(val) = lookup("PULSE_DEBOUNCE_MS") {
            match val.parse::<u64>() {
                Ok(ms) => config.debounce = Duration::from_millis(ms),
                Err(_) => tracing::warn!(value = %val, "Invalid PULSE_DEBOUNCE_MS, using default"),
            }
        }

        if let Some(val) = lookup("PULSE_POLL_INTERVAL_SECS") {
            match val.parse::<u64>() {
                Ok(0) => config.poll_interval = None,
                Ok(secs) => config.poll_interval = Some(Duration::from_secs(secs)),
                Err(_) => {
                    tracing::warn!(value = %val, "Invalid PULSE_POLL_INTERVAL_SECS, polling disabled")
                }
            }
        }

        if let Some(id) = lookup("PULSE_ASSISTANT_ID").filter(|v| !v.trim().is_empty()) {
            config.assistant_id = UserId(id.trim().to_string());
        }

        if let Some(label) = lookup("PULSE_ASSISTANT_LABEL").filter(|v| !v.trim().is_empty()) {
            config.assistant_label = label.trim().to_string();
        }

        // "undefined" is what a misconfigured bundler injects; treat as unset.
        config.gemini_api_key = lookup("GEMINI_API_KEY")
            .or_else(|| lookup("API_KEY"))
            .filter(|k| !k.is_empty() && k != "undefined");

        if let Some(model) = lookup("GEMINI_MODEL").filter(|v| !v.is_empty()) {
            config.gemini_model = model;
        }

        if let Some(val) = lookup("PULSE_REPLY_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                config.reply_timeout = Duration::from_secs(secs);
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.debounce, Duration::from_millis(250));
        assert!(config.poll_interval.is_none());
        assert_eq!(config.assistant_id, UserId::from("usr-001"));
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = SyncConfig::from_lookup(lookup(&[
            ("PULSE_DATA_DIR", "/tmp/pulse"),
            ("PULSE_DEBOUNCE_MS", "40"),
            ("PULSE_POLL_INTERVAL_SECS", "15"),
            ("PULSE_ASSISTANT_ID", "usr-bot"),
            ("API_KEY", "secret"),
        ]));
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/pulse")));
        assert_eq!(config.debounce, Duration::from_millis(40));
        assert_eq!(config.poll_interval, Some(Duration::from_secs(15)));
        assert_eq!(config.assistant_id, UserId::from("usr-bot"));
        assert_eq!(config.gemini_api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = SyncConfig::from_lookup(lookup(&[
            ("PULSE_DEBOUNCE_MS", "soon"),
            ("PULSE_POLL_INTERVAL_SECS", "0"),
            ("GEMINI_API_KEY", "undefined"),
        ]));
        assert_eq!(config.debounce, Duration::from_millis(250));
        assert!(config.poll_interval.is_none());
        assert!(config.gemini_api_key.is_none());
    }
}
