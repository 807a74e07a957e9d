//! Language-model backend
//!
//! The pipeline depends only on the `LlmClient` trait; the HTTP client for an
//! OpenAI-compatible chat endpoint is injected at startup. Transient backend
//! failures (timeouts, 429, 5xx) are retried with bounded exponential
//! backoff; everything else surfaces to the caller.

use crate::config::LlmConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    /// Transport-level failure (network, timeout); retryable
    #[error("Model backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Non-2xx response from the API; retryable for 429 and 5xx
    #[error("Model API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected schema
    #[error("Malformed model API response: {0}")]
    MalformedResponse(String),

    #[error("Empty response from model")]
    EmptyResponse,

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Trait for language-model backends
///
/// One prompt in, one completion out. Provider and model selection are
/// configuration concerns of the concrete client.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

/// HTTP client for an OpenAI-compatible chat completions endpoint
pub struct HttpLlmClient {
    config: LlmConfig,
    api_key: String,
    client: reqwest::Client,
}

const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

impl HttpLlmClient {
    pub fn new(config: LlmConfig, api_key: String) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Client(e.to_string()))?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    async fn call(&self, prompt: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::BackendUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, message });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(LlmError::EmptyResponse)
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let mut attempt = 0u32;
        loop {
            match self.call(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if attempt < self.config.max_retries && is_transient(&e) => {
                    let delay = RETRY_BASE_DELAY * 2u32.pow(attempt);
                    attempt += 1;
                    tracing::warn!(
                        "Transient model backend failure (attempt {}/{}), retrying in {:?}: {}",
                        attempt,
                        self.config.max_retries,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Whether an error is worth retrying
fn is_transient(error: &LlmError) -> bool {
    match error {
        LlmError::BackendUnavailable(_) => true,
        LlmError::Api { status, .. } => *status == 429 || (500..=599).contains(status),
        _ => false,
    }
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}
