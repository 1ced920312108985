//! # LLM Gateway
//!
//! Converts a structured prompt into text. The gateway owns retry policy and
//! request timeouts; backends only translate one request into one upstream call.
//!
//! ```text
//! generate(system, messages, options)
//!        │
//!        ├── RetryPolicy (TransientUpstream / Timeout only)
//!        │      └── tokio::time::timeout(options.timeout)
//!        │             └── LlmBackend::complete
//!        │                    ├── LocalBackend  (OpenAI-compatible HTTP)
//!        │                    └── CloudBackend  (radkit providers)
//!        ▼
//!      text  (empty only when every attempt came back empty)
//! ```

pub mod cloud;
pub mod local;
pub mod retry;

pub use cloud::CloudBackend;
pub use local::LocalBackend;
pub use retry::RetryPolicy;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::LlmSettings;
use crate::error::{TeamflowError, TeamflowResult};
use crate::models::LlmBackendKind;

/// Retry reason for a blank completion; resolved to `Ok("")` once attempts run out
const EMPTY_COMPLETION: &str = "backend returned an empty completion";

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// A single chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Generation parameters
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Per-request timeout (each retry attempt gets a fresh one)
    pub timeout: Duration,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        LlmSettings::default().generate_options()
    }
}

/// One fully-specified completion request
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationRequest {
    /// Flatten the conversation into a single transcript for providers that
    /// accept one input string
    pub fn transcript(&self) -> String {
        if let [only] = self.messages.as_slice() {
            if only.role == ChatRole::User {
                return only.content.clone();
            }
        }
        self.messages
            .iter()
            .map(|m| format!("[{}]\n{}", m.role.as_str().to_uppercase(), m.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// A single upstream completion call
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Short identifier for logs (`local:llama3.1`, `cloud:Anthropic/...`)
    fn describe(&self) -> String;

    async fn complete(&self, request: &GenerationRequest) -> TeamflowResult<String>;
}

/// Retrying, timeout-enforcing front door to an [`LlmBackend`]
#[derive(Clone)]
pub struct LlmGateway {
    backend: Arc<dyn LlmBackend>,
    retry: RetryPolicy,
}

impl fmt::Debug for LlmGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmGateway")
            .field("backend", &self.backend.describe())
            .field("retry", &self.retry)
            .finish()
    }
}

impl LlmGateway {
    pub fn new(backend: Arc<dyn LlmBackend>, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    /// Build the backend selected by the settings
    pub fn from_settings(settings: &LlmSettings, retry: RetryPolicy) -> TeamflowResult<Self> {
        let backend: Arc<dyn LlmBackend> = match settings.backend {
            LlmBackendKind::Local => Arc::new(LocalBackend::from_settings(settings)?),
            LlmBackendKind::Cloud => Arc::new(CloudBackend::new(settings.model_config())),
        };
        tracing::info!(backend = %backend.describe(), "LLM gateway ready");
        Ok(Self::new(backend, retry))
    }

    /// Generate text. Blank completions are retried like transient failures;
    /// if the last attempt is still blank the result is an empty string, which
    /// callers mark as "no output" instead of failing the task.
    pub async fn generate(
        &self,
        system: &str,
        messages: Vec<ChatMessage>,
        options: &GenerateOptions,
    ) -> TeamflowResult<String> {
        if messages.is_empty() {
            return Err(TeamflowError::InternalInvariant(
                "generate called without messages".to_string(),
            ));
        }

        let request = GenerationRequest {
            system: system.to_string(),
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };
        let request_ref = &request;
        let timeout = options.timeout;
        let backend = Arc::clone(&self.backend);

        let result = self
            .retry
            .run("llm_generate", |attempt| {
                let backend = Arc::clone(&backend);
                let request = request_ref;
                async move {
                    tracing::debug!(attempt, backend = %backend.describe(), "LLM request");
                    let text = match tokio::time::timeout(timeout, backend.complete(request)).await
                    {
                        Ok(result) => result?,
                        Err(_) => {
                            return Err(TeamflowError::timeout(format!(
                                "LLM request after {}s",
                                timeout.as_secs_f32()
                            )))
                        }
                    };
                    if text.trim().is_empty() {
                        return Err(TeamflowError::TransientUpstream(EMPTY_COMPLETION.to_string()));
                    }
                    Ok(text)
                }
            })
            .await;

        match result {
            Err(TeamflowError::TransientUpstream(reason)) if reason == EMPTY_COMPLETION => {
                tracing::warn!(
                    backend = %self.backend.describe(),
                    attempts = self.retry.max_attempts,
                    "LLM returned only empty completions"
                );
                Ok(String::new())
            }
            result => result.map_err(|err| retry::exhausted("LLM generation", err, self.retry.max_attempts)),
        }
    }
}
