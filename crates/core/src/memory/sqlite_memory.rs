//! # SQLite Memory Store
//!
//! Persistent memory in the `memory_entries` table of [`TeamflowDb`].
//! Each append is one transaction (insert + retention prune), so readers
//! never see a partial entry and concurrent runs serialize on the
//! connection lock.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::{MemoryEntry, MemoryStore, RecallStrategy};
use crate::error::{TeamflowError, TeamflowResult};
use crate::state::TeamflowDb;

/// SQLite-backed memory store using the shared database connection
pub struct SqliteMemoryStore {
    conn: Arc<Mutex<Connection>>,
    window: usize,
    strategy: RecallStrategy,
}

impl SqliteMemoryStore {
    pub fn new(db: &TeamflowDb, window: usize, strategy: RecallStrategy) -> Self {
        Self {
            conn: db.connection(),
            window: window.max(1),
            strategy,
        }
    }

    fn insert(&self, entry: &MemoryEntry) -> Result<()> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let metadata = serde_json::to_string(&entry.metadata)?;
        let tx = conn.transaction().context("Failed to begin memory transaction")?;
        tx.execute(
            "INSERT INTO memory_entries (query, response, metadata_json, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![entry.query, entry.response, metadata, entry.timestamp.to_rfc3339()],
        )
        .context("Failed to insert memory")?;
        let evicted = tx
            .execute(
                r#"
                DELETE FROM memory_entries
                WHERE id NOT IN (SELECT id FROM memory_entries ORDER BY id DESC LIMIT ?1)
                "#,
                params![self.window as i64],
            )
            .context("Failed to apply memory retention")?;
        tx.commit().context("Failed to commit memory entry")?;

        if evicted > 0 {
            tracing::debug!(evicted, window = self.window, "Evicted old memory entries");
        }
        Ok(())
    }

    fn select_recent(&self, limit: usize) -> Result<Vec<MemoryEntry>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let mut stmt = conn.prepare(
            r#"
            SELECT query, response, metadata_json, created_at
            FROM memory_entries
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list memories")?;

        rows.into_iter()
            .map(|(query, response, metadata_json, created_at)| {
                let metadata: BTreeMap<String, serde_json::Value> =
                    serde_json::from_str(&metadata_json).unwrap_or_default();
                let timestamp = DateTime::parse_from_rfc3339(&created_at)
                    .with_context(|| format!("Corrupt memory timestamp: {}", created_at))?
                    .with_timezone(&Utc);
                Ok(MemoryEntry {
                    query,
                    response,
                    timestamp,
                    metadata,
                })
            })
            .collect()
    }

    fn row_count(&self) -> Result<usize> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM memory_entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[async_trait]
impl MemoryStore for SqliteMemoryStore {
    async fn append(&self, entry: MemoryEntry) -> TeamflowResult<()> {
        self.insert(&entry).map_err(TeamflowError::storage)
    }

    async fn recent(&self, limit: usize) -> TeamflowResult<Vec<MemoryEntry>> {
        self.select_recent(limit).map_err(TeamflowError::storage)
    }

    async fn count(&self) -> TeamflowResult<usize> {
        self.row_count().map_err(TeamflowError::storage)
    }

    fn window(&self) -> usize {
        self.window
    }

    fn strategy(&self) -> RecallStrategy {
        self.strategy
    }
}
