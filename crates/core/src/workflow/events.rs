//! # Workflow Events
//!
//! Lifecycle events streamed to an optional subscriber (CLI progress, SSE).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowEventKind {
    RunStarted,
    PreSearchCompleted,
    TeamStarted,
    TeamCompleted,
    TeamFailed,
    RunCompleted,
    RunFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: WorkflowEventKind,
    pub run_id: String,
    /// Team the event concerns, if any
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl WorkflowEvent {
    pub fn new(kind: WorkflowEventKind, run_id: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            run_id: run_id.to_string(),
            team: None,
            data: None,
        }
    }

    pub fn with_team(mut self, team: &str) -> Self {
        self.team = Some(team.to_string());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Sending half handed to the orchestrator
pub type EventSender = mpsc::UnboundedSender<WorkflowEvent>;

/// Best-effort send; a dropped receiver only disables streaming
pub(crate) fn emit(sender: Option<&EventSender>, event: WorkflowEvent) {
    if let Some(tx) = sender {
        if tx.send(event).is_err() {
            tracing::debug!("Workflow event receiver dropped");
        }
    }
}
