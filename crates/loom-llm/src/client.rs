use std::env;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::errors::LlmError;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Narrow chat-completion capability. All message shapes are plain
/// structured records; providers are swapped by handing in a different
/// implementation, never by branching on provider identity here.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat_completion(
        &self,
        messages: &[ChatMessage],
        model: Option<&str>,
        temperature: f32,
    ) -> Result<String, LlmError>;
}

#[derive(Clone, Debug)]
pub struct OpenAiClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub default_model: String,
    pub timeout: Duration,
}

impl OpenAiClientConfig {
    /// Reads `OPENAI_API_KEY`/`API_KEY`, `OPENAI_BASE_URL`/`BASE_URL`,
    /// `OPENAI_MODEL`/`MODEL_STD`, and `LLM_TIMEOUT` per spec §6.
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key = env::var("OPENAI_API_KEY")
            .or_else(|_| env::var("API_KEY"))
            .map_err(|_| {
                LlmError::Configuration("OPENAI_API_KEY (or API_KEY) is not set".into())
            })?;

        let base_url = env::var("OPENAI_BASE_URL")
            .or_else(|_| env::var("BASE_URL"))
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

        let default_model = env::var("OPENAI_MODEL")
            .or_else(|_| env::var("MODEL_STD"))
            .map_err(|_| {
                LlmError::Configuration("OPENAI_MODEL (or MODEL_STD) is not set".into())
            })?;

        let timeout = env::var("LLM_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        Ok(Self {
            api_key,
            base_url,
            default_model,
            timeout,
        })
    }
}

/// A client against an OpenAI-compatible Chat Completions endpoint.
pub struct OpenAiClient {
    http: reqwest::Client,
    config: OpenAiClientConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiClientConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(e.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> Result<Self, LlmError> {
        Self::new(OpenAiClientConfig::from_env()?)
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat_completion(
        &self,
        messages: &[ChatMessage],
        model: Option<&str>,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let target_model = model.unwrap_or(&self.config.default_model);
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let body = json!({
            "model": target_model,
            "messages": messages,
            "temperature": temperature,
        });

        debug!(model = target_model, messages = messages.len(), "chat_completion request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Transport(format!(
                "HTTP {status}: {text}"
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        extract_message_content(&payload)
    }
}

/// Extracts the first choice's message content, tolerating both a plain
/// string and a list of `{text}` fragments (some providers stream content as
/// a list even in non-streaming responses).
fn extract_message_content(payload: &Value) -> Result<String, LlmError> {
    let choices = payload
        .get("choices")
        .and_then(Value::as_array)
        .ok_or(LlmError::Empty)?;
    let first = choices.first().ok_or(LlmError::Empty)?;
    let content = first
        .get("message")
        .and_then(|m| m.get("content"))
        .ok_or(LlmError::NoTextContent)?;

    if let Some(text) = content.as_str() {
        return Ok(text.to_string());
    }

    if let Some(parts) = content.as_array() {
        let joined: String = parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect();
        if !joined.is_empty() {
            return Ok(joined);
        }
    }

    warn!("chat_completion response had no usable text content");
    Err(LlmError::NoTextContent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_plain_string_content() {
        let payload = json!({
            "choices": [{"message": {"content": "hello"}}]
        });
        assert_eq!(extract_message_content(&payload).unwrap(), "hello");
    }

    #[test]
    fn extracts_fragment_list_content() {
        let payload = json!({
            "choices": [{"message": {"content": [{"text": "foo"}, {"text": "bar"}]}}]
        });
        assert_eq!(extract_message_content(&payload).unwrap(), "foobar");
    }

    #[test]
    fn empty_choices_is_an_error() {
        let payload = json!({"choices": []});
        assert!(matches!(extract_message_content(&payload), Err(LlmError::Empty)));
    }
}
