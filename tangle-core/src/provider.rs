//! Chat-completion providers.
//!
//! Provides a `ChatProvider` trait with implementations for:
//! - **OpenAI-compatible** — any `/chat/completions` endpoint (Groq, OpenAI)
//! - **Mock** — local deterministic graph, no network
//!
//! The provider is chosen once at startup by [`create_provider`] and shared
//! read-only for the life of the process.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ProviderConfig;
use crate::mock::mock_graph;
use crate::models::GraphResult;

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const GROQ_DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

// ============================================================================
// ChatProvider trait
// ============================================================================

/// One system instruction plus one user turn, with generation limits.
#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub user: &'a str,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// What a provider produced for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Model text, still to be normalized.
    Raw(String),
    /// A graph built locally, forwarded without text repair.
    Graph(GraphResult),
}

/// Abstraction over chat-completion backends.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Return a single completion.
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion, ProviderError>;

    /// Provider name for logging.
    fn name(&self) -> &str;

    fn model(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("completion contained no choices")]
    EmptyCompletion,

    #[error("Missing API key")]
    MissingApiKey,
}

// ============================================================================
// Provider selection
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Groq,
    OpenAi,
    Mock,
}

impl ProviderKind {
    /// Unknown names select the mock.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "groq" => ProviderKind::Groq,
            "openai" => ProviderKind::OpenAi,
            _ => ProviderKind::Mock,
        }
    }

    fn defaults(self) -> Option<(&'static str, &'static str, &'static str)> {
        match self {
            ProviderKind::Groq => Some(("groq", GROQ_BASE_URL, GROQ_DEFAULT_MODEL)),
            ProviderKind::OpenAi => Some(("openai", OPENAI_BASE_URL, OPENAI_DEFAULT_MODEL)),
            ProviderKind::Mock => None,
        }
    }

    /// Environment variable holding the API key for this provider.
    pub fn api_key_env(self) -> Option<&'static str> {
        match self {
            ProviderKind::Groq => Some("GROQ_API_KEY"),
            ProviderKind::OpenAi => Some("OPENAI_API_KEY"),
            ProviderKind::Mock => None,
        }
    }
}

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub name: String,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

/// Build the provider described by `config`.
///
/// `mock` and unknown names give the mock provider. A live provider whose
/// API key is unset is treated as unconfigured and also gives the mock.
pub fn create_provider(config: &ProviderConfig) -> Result<Box<dyn ChatProvider>, ProviderError> {
    let kind = ProviderKind::from_name(&config.name);
    let Some((name, default_base, default_model)) = kind.defaults() else {
        if !config.name.eq_ignore_ascii_case("mock") {
            tracing::warn!(provider = %config.name, "Unknown provider, using mock mode");
        }
        return Ok(Box::new(MockProvider));
    };

    let key_env = config
        .api_key_env
        .clone()
        .or_else(|| kind.api_key_env().map(str::to_string))
        .unwrap_or_default();
    let api_key = std::env::var(&key_env).unwrap_or_default();
    if api_key.trim().is_empty() {
        tracing::warn!(
            provider = name,
            env = %key_env,
            "API key not set, using mock mode"
        );
        return Ok(Box::new(MockProvider));
    }

    let client = OpenAiCompatibleClient::new(ClientConfig {
        name: name.to_string(),
        api_key,
        base_url: config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base.to_string()),
        model: config
            .model
            .clone()
            .unwrap_or_else(|| default_model.to_string()),
        timeout: request_timeout(config.timeout_seconds),
    })?;
    Ok(Box::new(client))
}

/// A zero timeout would fail every call, so it is raised to one second.
fn request_timeout(seconds: u64) -> Duration {
    Duration::from_secs(seconds.max(1))
}

// ============================================================================
// Chat completion API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatErrorResponse {
    error: Option<ChatErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ChatErrorDetail {
    message: String,
}

// ============================================================================
// OpenAiCompatibleClient
// ============================================================================

/// Calls `POST {base_url}/chat/completions` with bearer auth.
///
/// No retries: a failed call is reported on the first attempt. Every call is
/// bounded by the configured timeout.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleClient {
    client: Client,
    config: ClientConfig,
}

impl OpenAiCompatibleClient {
    pub fn new(config: ClientConfig) -> Result<Self, ProviderError> {
        if config.api_key.is_empty() {
            return Err(ProviderError::MissingApiKey);
        }

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { client, config })
    }

    async fn complete_once(&self, request: &CompletionRequest<'_>) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: request.system,
                },
                ChatMessage {
                    role: "user",
                    content: request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ChatErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error)
                .map(|e| e.message)
                .unwrap_or(error_body);

            tracing::error!(
                provider = %self.config.name,
                code = status.as_u16(),
                message = %message,
                "Chat completion API error"
            );

            return Err(ProviderError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response.json().await.map_err(|e| self.classify(e))?;

        // A null `content` is an answer the normalizer rejects, not a
        // provider failure.
        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or(ProviderError::EmptyCompletion)
    }

    fn classify(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout {
                seconds: self.config.timeout.as_secs(),
            }
        } else {
            ProviderError::Http(e)
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatibleClient {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion, ProviderError> {
        self.complete_once(request).await.map(Completion::Raw)
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

// ============================================================================
// MockProvider
// ============================================================================

/// Answers every request with a mock graph built from the user text. Never
/// fails and never touches the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockProvider;

#[async_trait]
impl ChatProvider for MockProvider {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion, ProviderError> {
        Ok(Completion::Graph(mock_graph(request.user)))
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "heuristic"
    }
}

// ============================================================================
// TESTS
// ============================================================================
