//! # Configuration
//!
//! `TeamflowConfig` is persisted as `<runtime_dir>/config.json` and then
//! overridden by `TEAMFLOW_*` environment variables. Secrets never live in
//! the file: only the *name* of the API key variable is stored.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::gateway::{GenerateOptions, RetryPolicy};
use crate::memory::{MemoryProvider, RecallStrategy};
use crate::models::{LlmBackendKind, LlmProvider, ModelConfig};

const CONFIG_FILE: &str = "config.json";

/// How external context reaches the agents
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Memory + web context is fetched before any LLM call (LLM has no tools)
    #[default]
    #[serde(rename = "pre-search")]
    PreSearch,
    /// The runtime binds declared tool handles per task; no pre-search step
    #[serde(rename = "native-tools")]
    NativeTools,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::PreSearch => "pre-search",
            ExecutionMode::NativeTools => "native-tools",
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "pre-search" | "presearch" => Ok(ExecutionMode::PreSearch),
            "native-tools" | "native" => Ok(ExecutionMode::NativeTools),
            other => Err(format!("unknown execution mode '{}'", other)),
        }
    }
}

/// Generation endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmSettings {
    pub backend: LlmBackendKind,
    /// Cloud provider (ignored by the local backend)
    pub provider: LlmProvider,
    pub model: String,
    /// Local endpoint root, e.g. `http://localhost:11434/v1`
    pub base_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            backend: LlmBackendKind::Local,
            provider: LlmProvider::Anthropic,
            model: "llama3.1".to_string(),
            base_url: "http://localhost:11434/v1".to_string(),
            api_key_env: "TEAMFLOW_LLM_API_KEY".to_string(),
            temperature: 0.7,
            max_tokens: 4096,
            request_timeout_secs: 120,
        }
    }
}

impl LlmSettings {
    /// Cloud provider selection derived from these settings
    pub fn model_config(&self) -> ModelConfig {
        let model = if self.model.trim().is_empty() {
            self.provider.default_model().to_string()
        } else {
            self.model.clone()
        };
        ModelConfig::with_provider(self.provider, model).with_base_url(self.base_url.clone())
    }

    pub fn generate_options(&self) -> GenerateOptions {
        GenerateOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

/// Complete runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TeamflowConfig {
    pub llm: LlmSettings,
    pub retry: RetryPolicy,
    pub mode: ExecutionMode,
    pub memory_enabled: bool,
    pub memory_provider: MemoryProvider,
    pub recall_strategy: RecallStrategy,
    /// K for memory recall
    pub max_memory_results: usize,
    /// Retention window of the memory store (entries)
    pub memory_window: usize,
    /// Per-team execution budget
    pub max_execution_time_secs: u64,
    /// Per-team request cap, 0 disables rate limiting
    pub max_rpm: u32,
    /// M most recent conversation turns passed into teams
    pub conversation_tail: usize,
    /// Maximum characters of uploaded document context
    pub document_context_limit: usize,
    pub web_search_enabled: bool,
    pub searxng_url: Option<String>,
}

impl Default for TeamflowConfig {
    fn default() -> Self {
        Self {
            llm: LlmSettings::default(),
            retry: RetryPolicy::default(),
            mode: ExecutionMode::PreSearch,
            memory_enabled: true,
            memory_provider: MemoryProvider::Sqlite,
            recall_strategy: RecallStrategy::Recency,
            max_memory_results: 3,
            memory_window: 200,
            max_execution_time_secs: 900,
            max_rpm: 20,
            conversation_tail: 3,
            document_context_limit: 20_000,
            web_search_enabled: true,
            searxng_url: None,
        }
    }
}

impl TeamflowConfig {
    /// Load `config.json` from the runtime directory, falling back to defaults
    pub async fn load(runtime_dir: &Path) -> Result<Self> {
        let path = runtime_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        serde_json::from_str(&content).with_context(|| format!("Invalid config file: {:?}", path))
    }

    /// Load the file, then apply environment overrides
    pub async fn load_with_env(runtime_dir: &Path) -> Result<Self> {
        let mut config = Self::load(runtime_dir).await?;
        config.apply_env();
        Ok(config)
    }

    /// Persist to `config.json` in the runtime directory
    pub async fn save(&self, runtime_dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(runtime_dir)
            .await
            .with_context(|| format!("Failed to create runtime directory: {:?}", runtime_dir))?;
        let path = runtime_dir.join(CONFIG_FILE);
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write config: {:?}", path))?;
        Ok(path)
    }

    /// Apply `TEAMFLOW_*` overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var(&lookup, "TEAMFLOW_LLM_BACKEND") {
            self.llm.backend = v;
        }
        if let Some(v) = parse_var(&lookup, "TEAMFLOW_LLM_PROVIDER") {
            self.llm.provider = v;
        }
        if let Some(v) = lookup("TEAMFLOW_LLM_MODEL").filter(|v| !v.trim().is_empty()) {
            self.llm.model = v;
        }
        if let Some(v) = lookup("TEAMFLOW_LLM_URL").filter(|v| !v.trim().is_empty()) {
            self.llm.base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = parse_var(&lookup, "TEAMFLOW_LLM_TEMPERATURE") {
            self.llm.temperature = v;
        }
        if let Some(v) = parse_var(&lookup, "TEAMFLOW_LLM_MAX_TOKENS") {
            self.llm.max_tokens = v;
        }
        if let Some(v) = parse_var(&lookup, "TEAMFLOW_RETRY_ATTEMPTS") {
            self.retry.max_attempts = v;
        }
        if let Some(v) = parse_var(&lookup, "TEAMFLOW_MODE") {
            self.mode = v;
        }
        if let Some(v) = parse_var(&lookup, "TEAMFLOW_MEMORY_ENABLED") {
            self.memory_enabled = v;
        }
        if let Some(v) = parse_var(&lookup, "TEAMFLOW_MEMORY_K") {
            self.max_memory_results = v;
        }
        if let Some(v) = parse_var(&lookup, "TEAMFLOW_MAX_EXECUTION_TIME") {
            self.max_execution_time_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "TEAMFLOW_MAX_RPM") {
            self.max_rpm = v;
        }
        if let Some(v) = lookup("SEARXNG_URL").filter(|v| !v.trim().is_empty()) {
            self.searxng_url = Some(v);
        }
    }

    /// Per-team execution budget
    pub fn team_budget(&self) -> Duration {
        Duration::from_secs(self.max_execution_time_secs)
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, "Ignoring unparseable environment override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = TeamflowConfig::default();
        assert_eq!(config.mode, ExecutionMode::PreSearch);
        assert_eq!(config.max_memory_results, 3);
        assert_eq!(config.conversation_tail, 3);
        assert!(config.memory_enabled);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("TEAMFLOW_LLM_BACKEND", "cloud"),
            ("TEAMFLOW_LLM_PROVIDER", "openai"),
            ("TEAMFLOW_MEMORY_K", "7"),
            ("TEAMFLOW_MAX_RPM", "0"),
            ("TEAMFLOW_MODE", "native-tools"),
            ("TEAMFLOW_LLM_URL", "http://gpu-box:8000/v1/"),
        ]);
        let mut config = TeamflowConfig::default();
        config.apply_env_from(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.llm.backend, LlmBackendKind::Cloud);
        assert_eq!(config.llm.provider, LlmProvider::OpenAI);
        assert_eq!(config.max_memory_results, 7);
        assert_eq!(config.max_rpm, 0);
        assert_eq!(config.mode, ExecutionMode::NativeTools);
        assert_eq!(config.llm.base_url, "http://gpu-box:8000/v1");
    }

    #[test]
    fn test_invalid_env_keeps_previous_value() {
        let mut config = TeamflowConfig::default();
        config.apply_env_from(|name| {
            (name == "TEAMFLOW_MEMORY_K").then(|| "plenty".to_string())
        });
        assert_eq!(config.max_memory_results, 3);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TeamflowConfig =
            serde_json::from_str(r#"{"mode": "native-tools", "llm": {"model": "qwen2.5"}}"#)
                .unwrap();
        assert_eq!(config.mode, ExecutionMode::NativeTools);
        assert_eq!(config.llm.model, "qwen2.5");
        assert_eq!(config.llm.max_tokens, 4096);
        assert_eq!(config.max_rpm, 20);
    }

    #[tokio::test]
    async fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = TeamflowConfig::default();
        config.max_memory_results = 5;
        config.save(dir.path()).await.unwrap();

        let loaded = TeamflowConfig::load(dir.path()).await.unwrap();
        assert_eq!(loaded, config);
    }
}
