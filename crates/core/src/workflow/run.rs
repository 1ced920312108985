//! # Workflow Run
//!
//! Run record and its state machine: `running → ok` or `running → failed`.
//! Any other transition is an internal invariant violation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::kind::WorkflowKind;
use crate::error::{ErrorKind, TeamflowError, TeamflowResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Ok,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Ok => "ok",
            RunStatus::Failed => "failed",
        }
    }
}

/// Structured failure attached to a failed run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunError {
    pub kind: ErrorKind,
    /// Upper-case code, e.g. `TRANSIENT_UPSTREAM`
    pub code: String,
    pub message: String,
    /// Team executing when the run failed; `None` before the first team
    pub team: Option<String>,
}

impl RunError {
    pub fn from_error(err: &TeamflowError, team: Option<&str>) -> Self {
        let kind = err.kind();
        Self {
            kind,
            code: kind.code().to_string(),
            message: err.to_string(),
            team: team.map(str::to_string),
        }
    }
}

/// One executed team's output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamOutput {
    /// 1-based execution position
    pub position: usize,
    pub name: String,
    pub slug: String,
    pub output: String,
    pub elapsed_ms: u64,
}

impl TeamOutput {
    /// Archive file name, e.g. `01_research.md`
    pub fn file_name(&self) -> String {
        format!("{:02}_{}.md", self.position, self.slug)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowRun {
    pub run_id: String,
    pub workflow_kind: WorkflowKind,
    pub query: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub team_outputs: Vec<TeamOutput>,
    pub composite_output: Option<String>,
    pub status: RunStatus,
    pub error: Option<RunError>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl WorkflowRun {
    /// New run in status `running` with a fresh uuid
    pub fn start(workflow_kind: WorkflowKind, query: impl Into<String>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            workflow_kind,
            query: query.into(),
            started_at: Utc::now(),
            finished_at: None,
            team_outputs: Vec::new(),
            composite_output: None,
            status: RunStatus::Running,
            error: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != RunStatus::Running
    }

    fn ensure_running(&self, transition: &str) -> TeamflowResult<()> {
        if self.status != RunStatus::Running {
            return Err(TeamflowError::InternalInvariant(format!(
                "run {}: cannot {} from status '{}'",
                self.run_id,
                transition,
                self.status.as_str()
            )));
        }
        Ok(())
    }

    /// Append a team's output in execution order
    pub fn record_team(
        &mut self,
        name: &str,
        slug: &str,
        output: String,
        elapsed_ms: u64,
    ) -> TeamflowResult<&TeamOutput> {
        self.ensure_running("record a team output")?;
        let position = self.team_outputs.len() + 1;
        self.team_outputs.push(TeamOutput {
            position,
            name: name.to_string(),
            slug: slug.to_string(),
            output,
            elapsed_ms,
        });
        Ok(&self.team_outputs[position - 1])
    }

    /// `running → ok`
    pub fn complete(&mut self, composite: String) -> TeamflowResult<()> {
        self.ensure_running("complete")?;
        self.status = RunStatus::Ok;
        self.composite_output = Some(composite);
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// `running → failed`
    pub fn fail(&mut self, error: RunError, composite: String) -> TeamflowResult<()> {
        self.ensure_running("fail")?;
        self.status = RunStatus::Failed;
        self.error = Some(error);
        self.composite_output = Some(composite);
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_transition() {
        let mut run = WorkflowRun::start(WorkflowKind::Standard, "q");
        assert_eq!(run.status, RunStatus::Running);
        let first = run.record_team("Research", "research", "r".into(), 5).unwrap();
        assert_eq!(first.file_name(), "01_research.md");
        run.complete("composite".into()).unwrap();
        assert_eq!(run.status, RunStatus::Ok);
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_terminal_states_reject_transitions() {
        let mut run = WorkflowRun::start(WorkflowKind::Standard, "q");
        let err = TeamflowError::TransientUpstream("503".into());
        run.fail(RunError::from_error(&err, Some("Research")), "partial".into())
            .unwrap();
        assert_eq!(run.error.as_ref().unwrap().code, "TRANSIENT_UPSTREAM");

        assert!(matches!(
            run.complete("again".into()),
            Err(TeamflowError::InternalInvariant(_))
        ));
        assert!(run.record_team("Analysis", "analysis", "a".into(), 1).is_err());
    }

    #[test]
    fn test_run_ids_are_unique() {
        let a = WorkflowRun::start(WorkflowKind::Standard, "q");
        let b = WorkflowRun::start(WorkflowKind::Standard, "q");
        assert_ne!(a.run_id, b.run_id);
    }
}
