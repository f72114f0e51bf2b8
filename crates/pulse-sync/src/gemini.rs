//! Reply generator backed by the Gemini `generateContent` HTTP API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SyncConfig;
use crate::error::ReplyError;
use crate::reply::{HistoryEntry, ReplyGenerator};

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Answer given when no API key is configured.
pub const NOT_CONFIGURED_TEXT: &str = "AI is not configured (missing API Key).";

/// Answer given when the model returns no text.
pub const EMPTY_ANSWER_TEXT: &str = "I'm not sure how to respond to that.";

pub struct GeminiReplyGenerator {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
}

impl GeminiReplyGenerator {
    pub fn new(config: &SyncConfig) -> Result<Self, ReplyError> {
        let client = reqwest::Client::builder()
            .timeout(config.reply_timeout)
            .build()?;
        Ok(Self {
            client,
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        })
    }

    /// Point at a different API host (proxy, emulator).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl ReplyGenerator for GeminiReplyGenerator {
    async fn generate_reply(
        &self,
        history: &[HistoryEntry],
        label: &str,
    ) -> Result<String, ReplyError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(NOT_CONFIGURED_TEXT.to_string());
        };

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(build_prompt(history, label)),
                }],
            }],
        };

        let resp = self
            .client
            .post(self.url())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ReplyError::Status(resp.status().as_u16()));
        }

        let parsed: GenerateResponse = resp.json().await?;
        let text = parsed.text();
        debug!(model = %self.model, chars = text.as_ref().map_or(0, |t| t.len()), "Generator answered");
        Ok(text.unwrap_or_else(|| EMPTY_ANSWER_TEXT.to_string()))
    }
}

pub fn build_prompt(history: &[HistoryEntry], label: &str) -> String {
    let lines = history
        .iter()
        .map(|h| format!("{}: {}", h.sender, h.text))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "You are participating in a group chat as {label}.\n\
         Context of the conversation:\n\
         {lines}\n\n\
         Respond naturally, concisely, and stay in character as a helpful colleague."
    )
}

// -- Wire types --

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl GenerateResponse {
    /// Text of the first candidate, its parts concatenated. `None` when
    /// there is no candidate or it carries no text.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(sender: &str, text: &str) -> HistoryEntry {
        HistoryEntry {
            sender: sender.into(),
            text: text.into(),
        }
    }

    #[test]
    fn test_prompt_lists_history_in_order() {
        let prompt = build_prompt(&[entry("Ada", "hi"), entry("Bob", "yo")], "Assistant");
        assert!(prompt.starts_with("You are participating in a group chat as Assistant."));
        assert!(prompt.contains("Ada: hi\nBob: yo"));
        assert!(prompt.ends_with("stay in character as a helpful colleague."));
    }

    #[test]
    fn test_response_text_extraction() {
        let parsed: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"team"}],"role":"model"}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.text().as_deref(), Some("Hello team"));

        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert_eq!(empty.text(), None);

        let blocked: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert_eq!(blocked.text(), None);
    }

    #[tokio::test]
    async fn test_missing_key_answers_without_network() {
        let generator = GeminiReplyGenerator::new(&SyncConfig::default()).unwrap();
        assert!(!generator.is_configured());

        let reply = generator
            .generate_reply(&[entry("Ada", "hi")], "Assistant")
            .await
            .unwrap();
        assert_eq!(reply, NOT_CONFIGURED_TEXT);
    }

    #[test]
    fn test_url_uses_model() {
        let config = SyncConfig {
            gemini_api_key: Some("k".into()),
            ..SyncConfig::default()
        };
        let generator = GeminiReplyGenerator::new(&config)
            .unwrap()
            .with_endpoint("http://localhost:9999/");
        assert_eq!(
            generator.url(),
            "http://localhost:9999/v1beta/models/gemini-3-flash-preview:generateContent"
        );
    }
}
