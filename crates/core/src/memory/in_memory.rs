//! Process-local memory store. Nothing survives a restart.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{MemoryEntry, MemoryStore, RecallStrategy};
use crate::error::{TeamflowError, TeamflowResult};

pub struct InMemoryMemoryStore {
    /// Oldest at the front
    entries: Mutex<VecDeque<MemoryEntry>>,
    window: usize,
    strategy: RecallStrategy,
}

impl InMemoryMemoryStore {
    pub fn new(window: usize, strategy: RecallStrategy) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            window: window.max(1),
            strategy,
        }
    }

    fn lock(&self) -> TeamflowResult<std::sync::MutexGuard<'_, VecDeque<MemoryEntry>>> {
        self.entries
            .lock()
            .map_err(|e| TeamflowError::StorageUnavailable(format!("Lock error: {}", e)))
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn append(&self, entry: MemoryEntry) -> TeamflowResult<()> {
        let mut entries = self.lock()?;
        entries.push_back(entry);
        while entries.len() > self.window {
            entries.pop_front();
        }
        Ok(())
    }

    async fn recent(&self, limit: usize) -> TeamflowResult<Vec<MemoryEntry>> {
        let entries = self.lock()?;
        Ok(entries.iter().rev().take(limit).cloned().collect())
    }

    async fn count(&self) -> TeamflowResult<usize> {
        Ok(self.lock()?.len())
    }

    fn window(&self) -> usize {
        self.window
    }

    fn strategy(&self) -> RecallStrategy {
        self.strategy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_window_and_order() {
        let store = InMemoryMemoryStore::new(2, RecallStrategy::Recency);
        for q in ["one", "two", "three"] {
            store.append(MemoryEntry::new(q, q.to_uppercase())).await.unwrap();
        }
        assert_eq!(store.count().await.unwrap(), 2);

        let recalled = store.recall("anything", 1).await.unwrap();
        assert!(recalled.contains("THREE"));
        assert!(!recalled.contains("ONE"));
    }

    #[tokio::test]
    async fn test_recall_on_empty_store_is_empty() {
        let store = InMemoryMemoryStore::new(5, RecallStrategy::Keyword);
        assert!(store.recall("q", 3).await.unwrap().is_empty());
        assert!(store.recall("q", 0).await.unwrap().is_empty());
    }
}
