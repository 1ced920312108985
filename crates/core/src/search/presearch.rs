//! # Pre-Search Manager
//!
//! Fetches memory and web context before any LLM call so that models
//! without function calling still see current information. Each source
//! fails independently; a failure only empties its own section.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use super::WebSearch;
use crate::memory::MemoryStore;

pub const PRIOR_CONTEXT_LABEL: &str = "PRIOR CONTEXT:";
pub const WEB_RESULTS_LABEL: &str = "WEB RESULTS:";

/// Shown inside a section with nothing in it
const EMPTY_SECTION: &str = "(none)";

/// Retrieval result for one query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchContext {
    pub query: String,
    pub memory_results: String,
    pub web_results: String,
    pub combined_context: String,
    pub search_time_seconds: f64,
}

impl SearchContext {
    pub fn new(
        query: impl Into<String>,
        memory_results: impl Into<String>,
        web_results: impl Into<String>,
        search_time_seconds: f64,
    ) -> Self {
        let memory_results = memory_results.into();
        let web_results = web_results.into();
        let combined_context = combine(&memory_results, &web_results);
        Self {
            query: query.into(),
            memory_results,
            web_results,
            combined_context,
            search_time_seconds,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.memory_results.trim().is_empty() && self.web_results.trim().is_empty()
    }
}

fn section(body: &str) -> &str {
    let body = body.trim();
    if body.is_empty() {
        EMPTY_SECTION
    } else {
        body
    }
}

/// `PRIOR CONTEXT:\n…\n\nWEB RESULTS:\n…`
pub fn combine(memory_results: &str, web_results: &str) -> String {
    format!(
        "{}\n{}\n\n{}\n{}",
        PRIOR_CONTEXT_LABEL,
        section(memory_results),
        WEB_RESULTS_LABEL,
        section(web_results)
    )
}

/// Builds a [`SearchContext`] from the memory store and the web adapter
#[derive(Clone)]
pub struct PreSearchManager {
    memory: Option<Arc<dyn MemoryStore>>,
    web: Arc<dyn WebSearch>,
    memory_k: usize,
}

impl PreSearchManager {
    /// `memory` is `None` when memory is disabled
    pub fn new(memory: Option<Arc<dyn MemoryStore>>, web: Arc<dyn WebSearch>, memory_k: usize) -> Self {
        Self {
            memory,
            web,
            memory_k,
        }
    }

    /// Never fails; a failing source contributes an empty section
    #[tracing::instrument(skip(self), fields(query_preview = %query.chars().take(50).collect::<String>()))]
    pub async fn search(&self, query: &str) -> SearchContext {
        let started = Instant::now();

        let memory_results = match &self.memory {
            Some(store) => match store.recall(query, self.memory_k).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, "Memory recall failed, continuing without prior context");
                    String::new()
                }
            },
            None => String::new(),
        };

        let web_results = match self.web.search(query).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(adapter = self.web.name(), error = %e, "Web search failed, continuing without web results");
                String::new()
            }
        };

        let elapsed = started.elapsed().as_secs_f64();
        tracing::info!(
            memory_chars = memory_results.len(),
            web_chars = web_results.len(),
            elapsed_ms = (elapsed * 1000.0) as u64,
            "Pre-search completed"
        );

        SearchContext::new(query, memory_results, web_results, elapsed)
    }
}
