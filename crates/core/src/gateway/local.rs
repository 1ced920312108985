//! # Local Backend
//!
//! OpenAI-compatible `/chat/completions` client for self-hosted endpoints
//! (Ollama, vLLM, LM Studio). The bearer token is optional and read from the
//! environment variable named in the settings; it is never logged.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{GenerationRequest, LlmBackend};
use crate::config::LlmSettings;
use crate::error::{TeamflowError, TeamflowResult};

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP client for an OpenAI-compatible endpoint
pub struct LocalBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl fmt::Debug for LocalBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalBackend")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl LocalBackend {
    pub fn new(base_url: &str, model: impl Into<String>, api_key: Option<String>) -> TeamflowResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent("teamflow/0.1")
            .build()
            .map_err(|e| TeamflowError::InputInvalid(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: completions_endpoint(base_url),
            model: model.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn from_settings(settings: &LlmSettings) -> TeamflowResult<Self> {
        let api_key = std::env::var(&settings.api_key_env).ok();
        Self::new(&settings.base_url, settings.model.clone(), api_key)
    }
}

/// `http://host:11434/v1` → `http://host:11434/v1/chat/completions`
fn completions_endpoint(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with("/chat/completions") {
        trimmed.to_string()
    } else {
        format!("{}/chat/completions", trimmed)
    }
}

/// Map an HTTP status to the error taxonomy
fn classify_status(status: reqwest::StatusCode, body: &str) -> TeamflowError {
    let snippet: String = body.chars().take(200).collect();
    let message = format!("HTTP {}: {}", status.as_u16(), snippet);
    if status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status == reqwest::StatusCode::GATEWAY_TIMEOUT
    {
        TeamflowError::timeout(message)
    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        TeamflowError::TransientUpstream(message)
    } else {
        TeamflowError::PermanentUpstream(message)
    }
}

fn classify_transport(err: reqwest::Error) -> TeamflowError {
    if err.is_timeout() {
        TeamflowError::timeout(format!("local LLM request: {}", err))
    } else {
        TeamflowError::TransientUpstream(format!("local LLM transport: {}", err))
    }
}

#[async_trait]
impl LlmBackend for LocalBackend {
    fn describe(&self) -> String {
        format!("local:{}", self.model)
    }

    async fn complete(&self, request: &GenerationRequest) -> TeamflowResult<String> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if !request.system.is_empty() {
            messages.push(WireMessage {
                role: "system",
                content: &request.system,
            });
        }
        messages.extend(request.messages.iter().map(|m| WireMessage {
            role: m.role.as_str(),
            content: &m.content,
        }));

        let body = CompletionBody {
            model: &self.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        };

        let mut builder = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(classify_transport)?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &text));
        }

        let parsed: CompletionResponse = response.json().await.map_err(|e| {
            TeamflowError::TransientUpstream(format!("unreadable completion payload: {}", e))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                TeamflowError::TransientUpstream("completion contained no choices".to_string())
            })
    }
}
