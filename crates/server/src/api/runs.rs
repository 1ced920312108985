//! # Archive and Memory API

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

use teamflow_core::state::{ArchiveSummary, ArchivedTeam, RunManifest};

use super::{ApiError, ApiResult, SharedState};

#[derive(Debug, Serialize, ToSchema)]
pub struct RunSummaryResponse {
    pub run_id: String,
    pub workflow_kind: String,
    pub query: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub teams_completed: usize,
    pub failed_team: Option<String>,
    pub error_code: Option<String>,
}

impl From<&RunManifest> for RunSummaryResponse {
    fn from(manifest: &RunManifest) -> Self {
        Self {
            run_id: manifest.run_id.clone(),
            workflow_kind: manifest.workflow_kind.as_str().to_string(),
            query: manifest.query.clone(),
            status: manifest.status.as_str().to_string(),
            started_at: manifest.started_at,
            finished_at: manifest.finished_at,
            teams_completed: manifest.teams.len(),
            failed_team: manifest.error.as_ref().and_then(|e| e.team.clone()),
            error_code: manifest.error.as_ref().map(|e| e.code.clone()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ArchiveSummaryResponse {
    pub total_runs: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_kind: BTreeMap<String, usize>,
}

impl From<ArchiveSummary> for ArchiveSummaryResponse {
    fn from(summary: ArchiveSummary) -> Self {
        Self {
            total_runs: summary.total_runs,
            by_status: summary.by_status,
            by_kind: summary.by_kind,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ArchivedTeamResponse {
    pub file: String,
    pub content: String,
}

impl From<ArchivedTeam> for ArchivedTeamResponse {
    fn from(team: ArchivedTeam) -> Self {
        Self {
            file: team.file,
            content: team.content,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RunDetailResponse {
    pub run: RunSummaryResponse,
    pub teams: Vec<ArchivedTeamResponse>,
    pub composite: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopicsResponse {
    /// False when memory is switched off in the configuration
    pub enabled: bool,
    pub topics: Vec<String>,
}

/// List archived runs, newest first
#[utoipa::path(
    get,
    path = "/api/v1/runs",
    tag = "runs",
    responses(
        (status = 200, description = "Archived runs", body = Vec<RunSummaryResponse>)
    )
)]
pub async fn list_runs(State(state): State<SharedState>) -> ApiResult<Vec<RunSummaryResponse>> {
    let manifests = state.orchestrator.archive().list().await?;
    Ok(Json(manifests.iter().map(Into::into).collect()))
}

/// Run counts by status and by workflow kind
#[utoipa::path(
    get,
    path = "/api/v1/runs/summary",
    tag = "runs",
    responses(
        (status = 200, description = "Archive totals", body = ArchiveSummaryResponse)
    )
)]
pub async fn runs_summary(State(state): State<SharedState>) -> ApiResult<ArchiveSummaryResponse> {
    let summary = state.orchestrator.archive().summary().await?;
    Ok(Json(summary.into()))
}

/// Full contents of one archived run
#[utoipa::path(
    get,
    path = "/api/v1/runs/{run_id}",
    tag = "runs",
    params(
        ("run_id" = String, Path, description = "Run identifier")
    ),
    responses(
        (status = 200, description = "Archived run", body = RunDetailResponse),
        (status = 404, description = "Unknown run", body = super::ErrorBody)
    )
)]
pub async fn get_run(
    State(state): State<SharedState>,
    Path(run_id): Path<String>,
) -> ApiResult<RunDetailResponse> {
    let archived = state
        .orchestrator
        .archive()
        .read(&run_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("run '{}' not found", run_id)))?;

    Ok(Json(RunDetailResponse {
        run: (&archived.manifest).into(),
        teams: archived.teams.into_iter().map(Into::into).collect(),
        composite: archived.composite,
    }))
}

/// Distinct topics of remembered runs, newest first
#[utoipa::path(
    get,
    path = "/api/v1/memory/topics",
    tag = "memory",
    responses(
        (status = 200, description = "Memory topics", body = TopicsResponse)
    )
)]
pub async fn memory_topics(State(state): State<SharedState>) -> ApiResult<TopicsResponse> {
    let Some(memory) = state.orchestrator.memory() else {
        return Ok(Json(TopicsResponse {
            enabled: false,
            topics: Vec::new(),
        }));
    };
    Ok(Json(TopicsResponse {
        enabled: true,
        topics: memory.topics().await?,
    }))
}
