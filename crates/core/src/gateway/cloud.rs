//! # Cloud Backend
//!
//! Hosted providers through radkit. Each provider client reads its API key
//! from the provider's standard environment variable (`ANTHROPIC_API_KEY`,
//! `OPENAI_API_KEY`, ...). Temperature and max tokens are applied per request;
//! temperature is clamped to the provider's accepted range.

use async_trait::async_trait;
use radkit::macros::LLMOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{GenerationRequest, LlmBackend};
use crate::error::{TeamflowError, TeamflowResult};
use crate::models::{LlmProvider, ModelConfig};

/// Runs an `LlmFunction` against whichever provider the config selects.
macro_rules! run_llm_function {
    ($config:expr, $output_type:ty, $system_prompt:expr, $input:expr, $temperature:expr, $max_tokens:expr) => {{
        use radkit::agent::LlmFunction;
        use radkit::models::providers::{
            AnthropicLlm, DeepSeekLlm, GeminiLlm, GrokLlm, OpenAILlm, OpenRouterLlm,
        };
        use $crate::models::LlmProvider;

        let config = $config;
        let temperature: f32 = $temperature;
        let max_tokens: u32 = $max_tokens;
        let result: anyhow::Result<$output_type> = match config.provider {
            LlmProvider::Anthropic => {
                let llm = AnthropicLlm::from_env(&config.model)?
                    .with_temperature(temperature)
                    .with_max_tokens(max_tokens);
                LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt)
                    .run($input)
                    .await
                    .map_err(Into::into)
            }
            LlmProvider::OpenAI => {
                let mut llm = OpenAILlm::from_env(&config.model)?
                    .with_temperature(temperature)
                    .with_max_tokens(max_tokens);
                if let Some(base_url) = &config.base_url {
                    llm = llm.with_base_url(base_url);
                }
                LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt)
                    .run($input)
                    .await
                    .map_err(Into::into)
            }
            LlmProvider::Gemini => {
                let llm = GeminiLlm::from_env(&config.model)?
                    .with_temperature(temperature)
                    .with_max_tokens(max_tokens);
                LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt)
                    .run($input)
                    .await
                    .map_err(Into::into)
            }
            LlmProvider::OpenRouter => {
                let llm = OpenRouterLlm::from_env(&config.model)?
                    .with_temperature(temperature)
                    .with_max_tokens(max_tokens);
                LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt)
                    .run($input)
                    .await
                    .map_err(Into::into)
            }
            LlmProvider::Grok => {
                let llm = GrokLlm::from_env(&config.model)?
                    .with_temperature(temperature)
                    .with_max_tokens(max_tokens);
                LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt)
                    .run($input)
                    .await
                    .map_err(Into::into)
            }
            LlmProvider::DeepSeek => {
                let llm = DeepSeekLlm::from_env(&config.model)?
                    .with_temperature(temperature)
                    .with_max_tokens(max_tokens);
                LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt)
                    .run($input)
                    .await
                    .map_err(Into::into)
            }
        };
        result
    }};
}

/// Free-form completion wrapped in a single field
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct GeneratedText {
    /// The complete response text, in Markdown where structure helps
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct CloudBackend {
    config: ModelConfig,
}

impl CloudBackend {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    async fn call(&self, request: &GenerationRequest) -> anyhow::Result<GeneratedText> {
        let temperature = temperature_for(self.config.provider, request.temperature);
        run_llm_function!(
            &self.config,
            GeneratedText,
            request.system.clone(),
            request.transcript(),
            temperature,
            request.max_tokens
        )
    }
}

/// Anthropic accepts 0.0..=1.0, the OpenAI-style providers 0.0..=2.0
fn temperature_for(provider: LlmProvider, requested: f32) -> f32 {
    let max = match provider {
        LlmProvider::Anthropic => 1.0,
        _ => 2.0,
    };
    if requested.is_finite() {
        requested.clamp(0.0, max)
    } else {
        0.0
    }
}

/// Provider errors arrive as opaque `anyhow` chains; classify by message.
fn classify(err: &anyhow::Error) -> TeamflowError {
    let message = format!("{:#}", err);
    let lower = message.to_lowercase();
    if lower.contains("timed out") || lower.contains("timeout") {
        TeamflowError::timeout(format!("cloud LLM request: {}", message))
    } else if lower.contains("401")
        || lower.contains("403")
        || lower.contains("api key")
        || lower.contains("api_key")
        || lower.contains("unauthorized")
        || lower.contains("invalid")
        || lower.contains("not found")
    {
        TeamflowError::PermanentUpstream(message)
    } else {
        TeamflowError::TransientUpstream(message)
    }
}

#[async_trait]
impl LlmBackend for CloudBackend {
    fn describe(&self) -> String {
        format!("cloud:{}/{}", self.config.provider, self.config.model)
    }

    async fn complete(&self, request: &GenerationRequest) -> TeamflowResult<String> {
        let output = self
            .call(request)
            .await
            .map_err(|e| classify(&e))?;
        Ok(output.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let auth = anyhow::anyhow!("HTTP 401: invalid x-api-key");
        assert!(matches!(classify(&auth), TeamflowError::PermanentUpstream(_)));

        let missing = anyhow::anyhow!("environment variable ANTHROPIC_API_KEY not set: api key missing");
        assert!(matches!(classify(&missing), TeamflowError::PermanentUpstream(_)));

        let overloaded = anyhow::anyhow!("HTTP 529: overloaded");
        assert!(matches!(classify(&overloaded), TeamflowError::TransientUpstream(_)));

        let slow = anyhow::anyhow!("operation timed out");
        assert!(matches!(classify(&slow), TeamflowError::Timeout { .. }));
    }

    #[test]
    fn test_temperature_clamped_per_provider() {
        assert_eq!(temperature_for(LlmProvider::Anthropic, 1.5), 1.0);
        assert_eq!(temperature_for(LlmProvider::OpenAI, 1.5), 1.5);
        assert_eq!(temperature_for(LlmProvider::Gemini, 3.0), 2.0);
        assert_eq!(temperature_for(LlmProvider::DeepSeek, -0.5), 0.0);
        assert_eq!(temperature_for(LlmProvider::Grok, f32::NAN), 0.0);
    }

    #[test]
    fn test_describe() {
        let backend = CloudBackend::new(ModelConfig::with_provider(LlmProvider::OpenAI, "gpt-4o"));
        assert_eq!(backend.describe(), "cloud:OpenAI/gpt-4o");
    }
}
