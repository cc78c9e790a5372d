//! Completion backend boundary.
//!
//! The language model is an opaque text-in/text-out service behind
//! [`CompletionBackend`]. The default implementation speaks the
//! chat-completions wire shape (OpenRouter-compatible); tests substitute
//! scripted implementations.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use execintel_shared::config::LlmConfig;
use execintel_shared::{ExecIntelError, Result};

/// User-Agent string for completion requests.
const USER_AGENT: &str = concat!("ExecIntel/", env!("CARGO_PKG_VERSION"));

/// Timeout for a single completion request.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Opaque text-in/text-out language-model service.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Send one prompt and return the raw completion text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
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
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

// ---------------------------------------------------------------------------
// HttpCompletion
// ---------------------------------------------------------------------------

/// Chat-completions HTTP client for the configured completion backend.
#[derive(Debug, Clone)]
pub struct HttpCompletion {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpCompletion {
    /// Create a backend client from config. The API key is read from the env
    /// var named in the config; a missing key is tolerated here (keyless
    /// test backends) and rejected by the CLI preflight instead.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                ExecIntelError::Completion(format!("failed to build HTTP client: {e}"))
            })?;

        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.is_empty());

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl CompletionBackend for HttpCompletion {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ExecIntelError::Completion(format!("completion request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExecIntelError::Completion(format!(
                "completion backend returned HTTP {status}"
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExecIntelError::Completion(format!("malformed completion response: {e}")))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ExecIntelError::Completion("completion had no choices".into()))?;

        debug!(len = content.len(), "completion received");
        Ok(content)
    }
}
