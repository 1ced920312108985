//! # Web Search Adapter
//!
//! `search(query) → text`. The default adapter queries SearXNG's JSON API:
//! the configured instance first (`SEARXNG_URL`), then a few public
//! instances, then a local install.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::TeamflowConfig;
use crate::error::{TeamflowError, TeamflowResult};
use crate::gateway::RetryPolicy;

const DEFAULT_MAX_RESULTS: usize = 5;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Opaque text search
#[async_trait]
pub trait WebSearch: Send + Sync {
    fn name(&self) -> &str;

    /// Plain-text results; empty when nothing was found
    async fn search(&self, query: &str) -> TeamflowResult<String>;
}

#[derive(Debug, Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    results: Vec<SearxngResult>,
}

#[derive(Debug, Deserialize)]
struct SearxngResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

/// SearXNG JSON API client
#[derive(Debug, Clone)]
pub struct SearxngSearch {
    client: reqwest::Client,
    endpoints: Vec<String>,
    max_results: usize,
    retry: RetryPolicy,
}

impl SearxngSearch {
    pub fn with_endpoints(endpoints: Vec<String>, retry: RetryPolicy) -> TeamflowResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("teamflow/0.1")
            .build()
            .map_err(|e| TeamflowError::InputInvalid(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoints,
            max_results: DEFAULT_MAX_RESULTS,
            retry,
        })
    }

    /// Configured instance, public instances, then localhost
    pub fn from_config(config: &TeamflowConfig) -> TeamflowResult<Self> {
        let mut endpoints: Vec<String> = Vec::new();

        if let Some(custom_url) = &config.searxng_url {
            endpoints.push(search_endpoint(custom_url));
        }

        // Full list: https://searx.space/
        endpoints.extend([
            "https://searx.be/search".to_string(),
            "https://search.sapti.me/search".to_string(),
            "https://searx.tiekoetter.com/search".to_string(),
        ]);

        endpoints.push("http://localhost:8888/search".to_string());
        endpoints.push("http://127.0.0.1:8888/search".to_string());

        Self::with_endpoints(endpoints, config.retry.clone())
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    /// One pass over every endpoint
    async fn query_endpoints(&self, query: &str) -> TeamflowResult<Vec<SearxngResult>> {
        let mut last_error = String::from("no search endpoints configured");

        for endpoint in &self.endpoints {
            let url = format!("{}?q={}&format=json", endpoint, urlencoding::encode(query));
            let response = match self.client.get(&url).send().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::debug!(endpoint = %endpoint, error = %e, "Search endpoint unreachable");
                    last_error = e.to_string();
                    continue;
                }
            };
            if !response.status().is_success() {
                last_error = format!("{} returned HTTP {}", endpoint, response.status().as_u16());
                continue;
            }
            match response.json::<SearxngResponse>().await {
                Ok(parsed) => return Ok(parsed.results),
                Err(e) => last_error = format!("{} returned unreadable JSON: {}", endpoint, e),
            }
        }

        Err(TeamflowError::TransientUpstream(last_error))
    }
}

/// `https://host/` → `https://host/search`
fn search_endpoint(base: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with("/search") {
        trimmed.to_string()
    } else {
        format!("{}/search", trimmed)
    }
}

fn format_results(results: &[SearxngResult], max_results: usize) -> String {
    results
        .iter()
        .filter(|r| !r.title.is_empty() || !r.content.is_empty())
        .take(max_results)
        .enumerate()
        .map(|(i, r)| {
            format!(
                "{}. {}\n   {}\n   {}",
                i + 1,
                r.title.trim(),
                r.url.trim(),
                r.content.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl WebSearch for SearxngSearch {
    fn name(&self) -> &str {
        "searxng"
    }

    async fn search(&self, query: &str) -> TeamflowResult<String> {
        let results = self
            .retry
            .run("web_search", |_| self.query_endpoints(query))
            .await
            .map_err(|e| crate::gateway::retry::exhausted("Web search", e, self.retry.max_attempts))?;
        tracing::debug!(count = results.len(), "Web search finished");
        Ok(format_results(&results, self.max_results))
    }
}

/// Adapter used when web search is switched off
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSearch;

#[async_trait]
impl WebSearch for DisabledSearch {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn search(&self, _query: &str) -> TeamflowResult<String> {
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_endpoint() {
        assert_eq!(search_endpoint("http://searx.local/"), "http://searx.local/search");
        assert_eq!(search_endpoint("http://searx.local/search"), "http://searx.local/search");
    }

    #[test]
    fn test_configured_instance_is_tried_first() {
        let mut config = TeamflowConfig::default();
        config.searxng_url = Some("http://searx.internal:8080".to_string());
        let search = SearxngSearch::from_config(&config).unwrap();
        assert_eq!(search.endpoints[0], "http://searx.internal:8080/search");
        assert!(search.endpoints.last().unwrap().contains("127.0.0.1"));
    }

    #[test]
    fn test_format_results_skips_blank_and_limits() {
        let raw = r#"{"results": [
            {"title": "Digital twin", "url": "https://a", "content": "A replica"},
            {"title": "", "url": "https://blank", "content": ""},
            {"title": "Second", "url": "https://b", "content": "More"},
            {"title": "Third", "url": "https://c", "content": "Cut"}
        ]}"#;
        let parsed: SearxngResponse = serde_json::from_str(raw).unwrap();
        let text = format_results(&parsed.results, 2);
        assert!(text.starts_with("1. Digital twin\n   https://a\n   A replica"));
        assert!(text.contains("2. Second"));
        assert!(!text.contains("Third"));
        assert!(!text.contains("blank"));
    }

    #[tokio::test]
    async fn test_no_endpoints_is_transient() {
        let search = SearxngSearch::with_endpoints(Vec::new(), RetryPolicy::none()).unwrap();
        let err = search.search("q").await.unwrap_err();
        assert!(matches!(err, TeamflowError::TransientUpstream(_)));
    }

    #[tokio::test]
    async fn test_disabled_search_is_empty() {
        assert!(DisabledSearch.search("anything").await.unwrap().is_empty());
    }
}
