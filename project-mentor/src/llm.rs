//! LLM client seam for collaborators that need a model behind them.
//!
//! The trait is intentionally tiny: one prompt in, plain text out. The
//! bundled implementation speaks the OpenAI-compatible chat-completions
//! dialect, which covers every hosted endpoint the classifier and architect
//! are expected to point at.

use project_mentor_sdk::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from a model call.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("Request to {endpoint} failed: {reason}")]
    RequestFailed { endpoint: String, reason: String },

    #[error("Endpoint returned status {status}: {body}")]
    BadStatus { status: u16, body: String },

    #[error("Response had no usable content")]
    EmptyResponse,
}

/// Minimal completion interface.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Settings for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f64,
}

/// HTTP client for OpenAI-compatible endpoints.
pub struct HttpLlmClient {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl HttpLlmClient {
    pub fn new(settings: LlmSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    fn request_body(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.settings.model.clone(),
            temperature: self.settings.temperature,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    temperature: f64,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let endpoint = format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.settings.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::BadStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse =
            response.json().await.map_err(|e| LlmError::RequestFailed {
                endpoint,
                reason: e.to_string(),
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

/// Extract a JSON payload from model output.
///
/// Handles ```json fenced blocks, generic ``` blocks, and raw JSON with
/// leading prose before the first brace.
pub fn extract_json_block(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        let rest = &text[start + 7..];
        return rest.split("```").next().unwrap_or(rest).trim();
    }
    if let Some(start) = text.find("```") {
        let rest = &text[start + 3..];
        return rest.split("```").next().unwrap_or(rest).trim();
    }
    match text.find('{') {
        Some(start) => text[start..].trim(),
        None => text.trim(),
    }
}
