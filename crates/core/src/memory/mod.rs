//! # Memory Module
//!
//! Append-only log of completed workflow runs used for cross-run recall.
//!
//! ## Architecture
//!
//! ```text
//! MemoryEntry {query, response, timestamp, metadata}
//!                    ↓
//!              MemoryStore (append / recent / count)
//!                    ↓ provided
//!        recall(query, k)  ·  topics()
//!                    ↓
//!   SqliteMemoryStore (persistent) or InMemoryMemoryStore
//! ```
//!
//! Both stores keep at most `window` entries; the oldest are evicted on
//! append. Recall ranks inside that window.

pub mod in_memory;
pub mod recall;
pub mod sqlite_memory;

pub use in_memory::InMemoryMemoryStore;
pub use sqlite_memory::SqliteMemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::TeamflowConfig;
use crate::error::TeamflowResult;
use crate::state::TeamflowDb;

/// Metadata key holding an explicit topic label
pub const TOPIC_KEY: &str = "topic";

/// Words of the query used when an entry carries no topic label
const TOPIC_WORDS: usize = 6;

/// Memory provider selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MemoryProvider {
    /// Process-local, lost on restart
    InMemory,
    /// SQLite file in the runtime directory
    #[default]
    Sqlite,
}

/// How `recall` ranks entries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecallStrategy {
    /// Newest first
    #[default]
    Recency,
    /// Token overlap with the query, newest first on ties; recency when
    /// nothing overlaps
    Keyword,
}

/// One completed (query, response) exchange
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryEntry {
    pub query: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
    /// String → scalar (string, number, bool)
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl MemoryEntry {
    pub fn new(query: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            response: response.into(),
            timestamp: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    /// Attach a metadata value. Arrays and objects are stored as their JSON text.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        let value = match value.into() {
            v @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
                serde_json::Value::String(v.to_string())
            }
            v => v,
        };
        self.metadata.insert(key.into(), value);
        self
    }

    /// Display label: the `topic` metadata value, else the first words of the query
    pub fn topic(&self) -> String {
        if let Some(topic) = self
            .metadata
            .get(TOPIC_KEY)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            return topic.to_string();
        }
        let words: Vec<&str> = self.query.split_whitespace().collect();
        let mut topic = words
            .iter()
            .take(TOPIC_WORDS)
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        if words.len() > TOPIC_WORDS {
            topic.push_str("...");
        }
        topic
    }
}

/// Durable (query, response) log
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Atomically append one entry, evicting beyond the retention window
    async fn append(&self, entry: MemoryEntry) -> TeamflowResult<()>;

    /// Up to `limit` entries, newest first
    async fn recent(&self, limit: usize) -> TeamflowResult<Vec<MemoryEntry>>;

    async fn count(&self) -> TeamflowResult<usize>;

    /// Retention window in entries
    fn window(&self) -> usize;

    fn strategy(&self) -> RecallStrategy;

    /// Text block of up to `k` relevant prior entries; empty when none
    async fn recall(&self, query: &str, k: usize) -> TeamflowResult<String> {
        if k == 0 {
            return Ok(String::new());
        }
        let candidates = self.recent(self.window()).await?;
        let selected = recall::select(candidates, query, k, self.strategy());
        Ok(recall::render(&selected))
    }

    /// Distinct topic labels, newest first
    async fn topics(&self) -> TeamflowResult<Vec<String>> {
        let entries = self.recent(self.window()).await?;
        let mut seen = std::collections::HashSet::new();
        Ok(entries
            .iter()
            .map(MemoryEntry::topic)
            .filter(|t| !t.is_empty() && seen.insert(t.to_lowercase()))
            .collect())
    }
}

/// Build the configured memory store
pub fn open_memory_store(
    config: &TeamflowConfig,
    db: Option<&TeamflowDb>,
) -> Arc<dyn MemoryStore> {
    let window = config.memory_window.max(1);
    match (config.memory_provider, db) {
        (MemoryProvider::Sqlite, Some(db)) => Arc::new(SqliteMemoryStore::new(
            db,
            window,
            config.recall_strategy,
        )),
        (MemoryProvider::Sqlite, None) => {
            tracing::warn!("SQLite memory requested without a database, using in-memory store");
            Arc::new(InMemoryMemoryStore::new(window, config.recall_strategy))
        }
        (MemoryProvider::InMemory, _) => {
            Arc::new(InMemoryMemoryStore::new(window, config.recall_strategy))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_prefers_metadata() {
        let entry = MemoryEntry::new("what is a digital twin", "...").with_meta(TOPIC_KEY, "Twins");
        assert_eq!(entry.topic(), "Twins");
    }

    #[test]
    fn test_topic_falls_back_to_query_words() {
        let entry = MemoryEntry::new(
            "how should a council govern its spatial data assets over time",
            "...",
        );
        assert_eq!(entry.topic(), "how should a council govern its...");
        assert_eq!(MemoryEntry::new("short query", "").topic(), "short query");
    }

    #[test]
    fn test_metadata_is_scalar() {
        let entry = MemoryEntry::new("q", "r")
            .with_meta("team_count", 3)
            .with_meta("teams", serde_json::json!(["a", "b"]));
        assert_eq!(entry.metadata["team_count"], serde_json::json!(3));
        assert!(entry.metadata["teams"].is_string());
    }

    #[tokio::test]
    async fn test_topics_are_distinct_newest_first() {
        let store = InMemoryMemoryStore::new(10, RecallStrategy::Recency);
        store.append(MemoryEntry::new("alpha", "1")).await.unwrap();
        store.append(MemoryEntry::new("beta", "2")).await.unwrap();
        store.append(MemoryEntry::new("Alpha", "3")).await.unwrap();

        let topics = store.topics().await.unwrap();
        assert_eq!(topics, vec!["Alpha".to_string(), "beta".to_string()]);
    }

    #[tokio::test]
    async fn test_open_memory_store_falls_back_without_db() {
        let config = TeamflowConfig::default();
        let store = open_memory_store(&config, None);
        assert_eq!(store.count().await.unwrap(), 0);
        assert_eq!(store.window(), config.memory_window);
    }
}
