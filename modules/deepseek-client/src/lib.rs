//! Minimal client for DeepSeek's OpenAI-compatible chat completions API.
//!
//! The curation pipeline only needs one interaction shape: system prompt +
//! user prompt in, a strict JSON array of per-record verdicts out. This crate
//! wraps that shape (request construction, code-fence stripping, and typed
//! array parsing) and nothing else.

mod error;
mod types;
mod util;

pub use error::ClientError;
pub use util::{strip_code_fences, truncate_chars};

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use types::{ChatRequest, ChatResponse, WireMessage};

const DEEPSEEK_API_URL: &str = "https://api.deepseek.com/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// DeepSeek chat completions client.
#[derive(Debug, Clone)]
pub struct DeepSeek {
    api_key: String,
    model: String,
    base_url: String,
    http: reqwest::Client,
}

impl DeepSeek {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEEPSEEK_API_URL.to_string(),
            http: reqwest::Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .expect("default reqwest client"),
        }
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self, ClientError> {
        let api_key =
            std::env::var("DEEPSEEK_API_KEY").map_err(|_| ClientError::MissingCredential)?;
        Ok(Self::new(api_key, model))
    }

    /// Point the client at a different endpoint (tests, proxies).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Replace the default 60 s request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client with timeout");
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Issue one chat completion and return the raw message content.
    pub async fn chat(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, ClientError> {
        let request = ChatRequest::new(&self.model)
            .message(WireMessage::system(system))
            .message(WireMessage::user(user))
            .temperature(temperature)
            .max_tokens(max_tokens);

        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.model, "chat completion request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, body });
        }

        let completion: ChatResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ClientError::EmptyCompletion)
    }

    /// Issue one chat completion and parse the content as a JSON array of `T`.
    ///
    /// Code fences are stripped before parsing, and a bare JSON object is
    /// promoted to a one-element array.
    pub async fn json_array<T: DeserializeOwned>(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Vec<T>, ClientError> {
        let content = self.chat(system, user, temperature, max_tokens).await?;
        parse_json_array(&content)
    }
}

/// Parse completion content as a JSON array of `T`.
pub fn parse_json_array<T: DeserializeOwned>(content: &str) -> Result<Vec<T>, ClientError> {
    let stripped = strip_code_fences(content);
    let value: serde_json::Value = serde_json::from_str(stripped)
        .map_err(|e| ClientError::malformed("completion content is not valid JSON", e))?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        object @ serde_json::Value::Object(_) => vec![object],
        other => {
            let err = <serde_json::Error as serde::de::Error>::custom(format!(
                "expected array or object, got {other}"
            ));
            return Err(ClientError::malformed("unexpected completion shape", err));
        }
    };

    items
        .into_iter()
        .map(|item| {
            serde_json::from_value(item)
                .map_err(|e| ClientError::malformed("array element has unexpected shape", e))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        name: String,
        score: f64,
    }

    #[test]
    fn parses_plain_array() {
        let rows: Vec<Row> = parse_json_array(r#"[{"name": "a", "score": 0.5}]"#).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "a");
    }

    #[test]
    fn promotes_single_object_to_array() {
        let rows: Vec<Row> = parse_json_array(r#"{"name": "solo", "score": 1.0}"#).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "solo");
    }

    #[test]
    fn parses_fenced_array() {
        let content = "```json\n[{\"name\": \"b\", \"score\": 0.2}]\n```";
        let rows: Vec<Row> = parse_json_array(content).unwrap();
        assert_eq!(rows[0].score, 0.2);
    }

    #[test]
    fn rejects_scalar_content() {
        let result: Result<Vec<Row>, _> = parse_json_array("42");
        assert!(matches!(
            result,
            Err(ClientError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn rejects_prose_content() {
        let result: Result<Vec<Row>, _> = parse_json_array("Sure! Here are the scores:");
        assert!(matches!(
            result,
            Err(ClientError::MalformedResponse { .. })
        ));
    }
}
