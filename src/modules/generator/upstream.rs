//! Client for the hosted chat-completion API (OpenRouter, OpenAI-compatible).

use std::time::Duration;

use async_trait::async_trait;
use blogsmith_kernel::settings::UpstreamSettings;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, instrument};

/// A message in the OpenAI chat format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system", "user", or "assistant"
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat completion request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<ChatMessage>,
}

/// Message inside a returned choice; providers may send `null` content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Chat completion response body. Only the fields we read are modelled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

impl ChatResponse {
    /// Text of the first choice, if it is present and non-empty.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.as_ref())
            .and_then(|message| message.content.as_deref())
            .filter(|content| !content.is_empty())
    }
}

/// Errors talking to the completion provider.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("no API key configured for the completion provider")]
    MissingCredential,

    #[error("request to completion provider failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("completion provider returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("completion provider sent an unreadable body: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Anything able to answer a chat completion request.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, UpstreamError>;
}

/// OpenRouter client. One POST per call, no retries; a call that outlives
/// `upstream.timeout_ms` fails as a transport error.
#[derive(Clone)]
pub struct OpenRouterClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    referer: String,
    app_title: String,
}

impl OpenRouterClient {
    pub fn new(settings: &UpstreamSettings) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()
            .map_err(UpstreamError::Client)?;
        let endpoint = format!(
            "{}/chat/completions",
            settings.base_url.trim_end_matches('/')
        );

        debug!(endpoint = %endpoint, model = %settings.model, "created completion client");

        Ok(Self {
            client,
            endpoint,
            api_key: settings.api_key().map(str::to_string),
            referer: settings.referer.clone(),
            app_title: settings.app_title.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionProvider for OpenRouterClient {
    #[instrument(skip_all, fields(model = %request.model, max_tokens = request.max_tokens))]
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, UpstreamError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(UpstreamError::MissingCredential)?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.app_title)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, "completion request failed");
                UpstreamError::Transport(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "completion provider error");
            return Err(UpstreamError::Status { status, body });
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            error!(error = ?e, "failed to parse completion response");
            UpstreamError::Decode(e)
        })?;

        debug!(choices = chat_response.choices.len(), "received completion");
        Ok(chat_response)
    }
}
