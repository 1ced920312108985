//! # Output Archive
//!
//! One directory per run under `<runtime_dir>/outputs/`:
//!
//! ```text
//! outputs/<run_id>/
//!   workflow.json      manifest, rewritten after every team
//!   01_<team>.md       one file per executed team, in execution order
//!   composite.md       final (or partial) composite report
//! ```

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::io::{list_dirs, list_files, write_atomic};
use crate::error::{TeamflowError, TeamflowResult};
use crate::workflow::{RunError, RunStatus, TeamOutput, WorkflowKind, WorkflowRun};

pub const OUTPUTS_DIR: &str = "outputs";
pub const MANIFEST_FILE: &str = "workflow.json";
pub const COMPOSITE_FILE: &str = "composite.md";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestTeam {
    pub position: usize,
    pub name: String,
    pub file: String,
    pub elapsed_ms: u64,
}

/// Contents of `workflow.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    pub run_id: String,
    pub workflow_kind: WorkflowKind,
    pub query: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub teams: Vec<ManifestTeam>,
    #[serde(default)]
    pub error: Option<RunError>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl RunManifest {
    pub fn from_run(run: &WorkflowRun) -> Self {
        Self {
            run_id: run.run_id.clone(),
            workflow_kind: run.workflow_kind,
            query: run.query.clone(),
            status: run.status,
            started_at: run.started_at,
            finished_at: run.finished_at,
            teams: run
                .team_outputs
                .iter()
                .map(|t| ManifestTeam {
                    position: t.position,
                    name: t.name.clone(),
                    file: t.file_name(),
                    elapsed_ms: t.elapsed_ms,
                })
                .collect(),
            error: run.error.clone(),
            metadata: run.metadata.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchivedTeam {
    pub file: String,
    pub content: String,
}

/// Everything stored for one run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchivedRun {
    pub manifest: RunManifest,
    pub teams: Vec<ArchivedTeam>,
    pub composite: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub total_runs: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_kind: BTreeMap<String, usize>,
}

/// Per-run output storage, partitioned by `run_id`
#[derive(Debug, Clone)]
pub struct OutputArchive {
    root: PathBuf,
}

impl OutputArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Archive rooted at `<runtime_dir>/outputs`
    pub fn in_runtime(runtime_dir: &Path) -> Self {
        Self::new(runtime_dir.join(OUTPUTS_DIR))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn run_dir(&self, run_id: &str) -> TeamflowResult<PathBuf> {
        let valid = !run_id.is_empty()
            && run_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(TeamflowError::InputInvalid(format!("invalid run id '{}'", run_id)));
        }
        Ok(self.root.join(run_id))
    }

    /// Write (or rewrite) `workflow.json` for a run
    pub async fn write_manifest(&self, run: &WorkflowRun) -> TeamflowResult<PathBuf> {
        let path = self.run_dir(&run.run_id)?.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(&RunManifest::from_run(run))
            .context("Failed to serialize run manifest")?;
        write_atomic(&path, &json).await?;
        Ok(path)
    }

    /// Write `NN_<slug>.md` for one team
    pub async fn write_team(&self, run_id: &str, team: &TeamOutput) -> TeamflowResult<PathBuf> {
        let path = self.run_dir(run_id)?.join(team.file_name());
        let content = format!("# {}\n\n{}\n", team.name, team.output);
        write_atomic(&path, &content).await?;
        tracing::debug!(run_id, team = %team.name, path = ?path, "Team output archived");
        Ok(path)
    }

    pub async fn write_composite(&self, run_id: &str, composite: &str) -> TeamflowResult<PathBuf> {
        let path = self.run_dir(run_id)?.join(COMPOSITE_FILE);
        write_atomic(&path, composite).await?;
        Ok(path)
    }

    async fn read_manifest(&self, dir: &Path) -> anyhow::Result<RunManifest> {
        let path = dir.join(MANIFEST_FILE);
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read manifest: {:?}", path))?;
        serde_json::from_str(&content).with_context(|| format!("Invalid manifest: {:?}", path))
    }

    /// Manifests of every archived run, newest first. Unreadable runs are
    /// skipped with a warning.
    pub async fn list(&self) -> TeamflowResult<Vec<RunManifest>> {
        let mut manifests = Vec::new();
        for name in list_dirs(&self.root).await? {
            match self.read_manifest(&self.root.join(&name)).await {
                Ok(manifest) => manifests.push(manifest),
                Err(e) => tracing::warn!(run_dir = %name, error = %e, "Skipping unreadable run"),
            }
        }
        manifests.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(manifests)
    }

    /// Full contents of a run; `None` when the run does not exist
    pub async fn read(&self, run_id: &str) -> TeamflowResult<Option<ArchivedRun>> {
        let dir = self.run_dir(run_id)?;
        if !dir.join(MANIFEST_FILE).exists() {
            return Ok(None);
        }
        let manifest = self.read_manifest(&dir).await?;

        let mut teams = Vec::new();
        for file in list_files(&dir).await? {
            if !is_team_file(&file) {
                continue;
            }
            let content = tokio::fs::read_to_string(dir.join(&file))
                .await
                .with_context(|| format!("Failed to read {}", file))?;
            teams.push(ArchivedTeam { file, content });
        }

        let composite_path = dir.join(COMPOSITE_FILE);
        let composite = if composite_path.exists() {
            Some(
                tokio::fs::read_to_string(&composite_path)
                    .await
                    .context("Failed to read composite report")?,
            )
        } else {
            None
        };

        Ok(Some(ArchivedRun {
            manifest,
            teams,
            composite,
        }))
    }

    /// Totals by status and by workflow kind
    pub async fn summary(&self) -> TeamflowResult<ArchiveSummary> {
        let mut summary = ArchiveSummary::default();
        for manifest in self.list().await? {
            summary.total_runs += 1;
            *summary
                .by_status
                .entry(manifest.status.as_str().to_string())
                .or_default() += 1;
            *summary
                .by_kind
                .entry(manifest.workflow_kind.as_str().to_string())
                .or_default() += 1;
        }
        Ok(summary)
    }
}

/// `NN_<slug>.md`
fn is_team_file(name: &str) -> bool {
    let bytes = name.as_bytes();
    name.ends_with(".md")
        && bytes.len() > 6
        && bytes[0].is_ascii_digit()
        && bytes[1].is_ascii_digit()
        && bytes[2] == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn archived_run(archive: &OutputArchive, kind: WorkflowKind, fail: bool) -> WorkflowRun {
        let mut run = WorkflowRun::start(kind, "what is a digital twin");
        let team = run
            .record_team("Research", "research", "findings".into(), 10)
            .unwrap()
            .clone();
        archive.write_team(&run.run_id, &team).await.unwrap();
        if fail {
            let err = TeamflowError::timeout("team Analysis");
            run.fail(RunError::from_error(&err, Some("Analysis")), "partial".into())
                .unwrap();
        } else {
            run.complete("# composite".into()).unwrap();
        }
        archive.write_manifest(&run).await.unwrap();
        archive
            .write_composite(&run.run_id, run.composite_output.as_deref().unwrap())
            .await
            .unwrap();
        run
    }

    #[tokio::test]
    async fn test_layout_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let archive = OutputArchive::in_runtime(dir.path());
        let run = archived_run(&archive, WorkflowKind::Standard, false).await;

        let run_dir = dir.path().join("outputs").join(&run.run_id);
        assert!(run_dir.join("workflow.json").exists());
        assert!(run_dir.join("01_research.md").exists());
        assert!(run_dir.join("composite.md").exists());

        let archived = archive.read(&run.run_id).await.unwrap().unwrap();
        assert_eq!(archived.manifest.status, RunStatus::Ok);
        assert_eq!(archived.manifest.teams[0].file, "01_research.md");
        assert_eq!(archived.teams.len(), 1);
        assert!(archived.teams[0].content.contains("findings"));
        assert_eq!(archived.composite.as_deref(), Some("# composite"));
    }

    #[tokio::test]
    async fn test_list_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let archive = OutputArchive::in_runtime(dir.path());
        archived_run(&archive, WorkflowKind::Standard, false).await;
        archived_run(&archive, WorkflowKind::Standard, true).await;
        let newest = archived_run(&archive, WorkflowKind::Geospatial, false).await;

        let runs = archive.list().await.unwrap();
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0].run_id, newest.run_id);

        let summary = archive.summary().await.unwrap();
        assert_eq!(summary.total_runs, 3);
        assert_eq!(summary.by_status.get("ok"), Some(&2));
        assert_eq!(summary.by_status.get("failed"), Some(&1));
        assert_eq!(summary.by_kind.get("standard"), Some(&2));
    }

    #[tokio::test]
    async fn test_unknown_and_malicious_run_ids() {
        let dir = tempfile::tempdir().unwrap();
        let archive = OutputArchive::in_runtime(dir.path());
        assert!(archive.read("no-such-run").await.unwrap().is_none());
        assert!(matches!(
            archive.read("../etc").await,
            Err(TeamflowError::InputInvalid(_))
        ));
        assert!(archive.list().await.unwrap().is_empty());
    }

    #[test]
    fn test_team_file_pattern() {
        assert!(is_team_file("01_research.md"));
        assert!(!is_team_file("composite.md"));
        assert!(!is_team_file("workflow.json"));
    }
}
