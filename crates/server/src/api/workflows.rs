//! # Workflow API
//!
//! Run a workflow synchronously and list the available kinds.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use teamflow_core::config::ExecutionMode;
use teamflow_core::gateway::ChatMessage;
use teamflow_core::workflow::{RunError, TeamOutput, WorkflowKind, WorkflowRequest, WorkflowResponse};

use super::{ApiError, ApiResult, SharedState};

/// One prior conversation turn
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct HistoryEntry {
    /// `user` or `assistant`
    pub role: String,
    pub content: String,
}

impl HistoryEntry {
    fn to_message(&self) -> ChatMessage {
        match self.role.trim().to_ascii_lowercase().as_str() {
            "assistant" => ChatMessage::assistant(self.content.clone()),
            _ => ChatMessage::user(self.content.clone()),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RunWorkflowRequest {
    /// Workflow kind, e.g. `standard`, `three-team`, `geospatial`
    pub kind: String,
    pub query: String,
    #[serde(default)]
    pub conversation_history: Vec<HistoryEntry>,
    #[serde(default)]
    pub document_context: Option<String>,
    /// `pre-search` or `native-tools`; defaults to the server configuration
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub deadline_secs: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TeamOutputResponse {
    pub position: usize,
    pub name: String,
    pub output: String,
    pub elapsed_ms: u64,
}

impl From<TeamOutput> for TeamOutputResponse {
    fn from(team: TeamOutput) -> Self {
        Self {
            position: team.position,
            name: team.name,
            output: team.output,
            elapsed_ms: team.elapsed_ms,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RunErrorResponse {
    pub code: String,
    pub message: String,
    /// Team executing when the run failed
    pub team: Option<String>,
}

impl From<RunError> for RunErrorResponse {
    fn from(err: RunError) -> Self {
        Self {
            code: err.code,
            message: err.message,
            team: err.team,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RunWorkflowResponse {
    pub run_id: String,
    pub workflow_kind: String,
    /// `ok` or `failed`
    pub status: String,
    pub composite_output: String,
    pub team_outputs: Vec<TeamOutputResponse>,
    pub error: Option<RunErrorResponse>,
}

impl From<WorkflowResponse> for RunWorkflowResponse {
    fn from(response: WorkflowResponse) -> Self {
        Self {
            run_id: response.run_id,
            workflow_kind: response.workflow_kind.as_str().to_string(),
            status: response.status.as_str().to_string(),
            composite_output: response.composite_output,
            team_outputs: response.team_outputs.into_iter().map(Into::into).collect(),
            error: response.error.map(Into::into),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WorkflowKindInfo {
    pub kind: String,
    pub name: String,
    /// Team names in execution order
    pub teams: Vec<String>,
}

/// Run a workflow to completion
///
/// A failing team still yields `200` with `status = failed`, the partial
/// composite and the failing team in `error`.
#[utoipa::path(
    post,
    path = "/api/v1/workflows",
    tag = "workflows",
    request_body = RunWorkflowRequest,
    responses(
        (status = 200, description = "Finished run (ok or failed)", body = RunWorkflowResponse),
        (status = 400, description = "Unknown kind, empty query or bad mode", body = super::ErrorBody)
    )
)]
pub async fn run_workflow(
    State(state): State<SharedState>,
    Json(req): Json<RunWorkflowRequest>,
) -> ApiResult<RunWorkflowResponse> {
    let kind: WorkflowKind = req.kind.parse()?;
    let mode = req
        .mode
        .as_deref()
        .map(str::parse::<ExecutionMode>)
        .transpose()
        .map_err(ApiError::bad_request)?;

    let request = WorkflowRequest {
        conversation_history: req.conversation_history.iter().map(HistoryEntry::to_message).collect(),
        document_context: req.document_context,
        mode,
        deadline_secs: req.deadline_secs,
    };

    let response = state.orchestrator.run_workflow(kind, &req.query, request).await?;
    Ok(Json(response.into()))
}

/// List workflow kinds and their pipelines
#[utoipa::path(
    get,
    path = "/api/v1/workflows/kinds",
    tag = "workflows",
    responses(
        (status = 200, description = "Available workflow kinds", body = Vec<WorkflowKindInfo>)
    )
)]
pub async fn list_kinds() -> Json<Vec<WorkflowKindInfo>> {
    Json(
        WorkflowKind::all()
            .iter()
            .map(|kind| WorkflowKindInfo {
                kind: kind.as_str().to_string(),
                name: kind.display_name().to_string(),
                teams: kind.pipeline().iter().map(|t| t.name().to_string()).collect(),
            })
            .collect(),
    )
}
