//! # HTTP API
//!
//! Thin axum layer over the core orchestrator, output archive, memory
//! store and ISO 19115 engine. Every route lives under `/api/v1`.

pub mod iso;
pub mod runs;
pub mod workflows;

use axum::{
    body::Body,
    http::{header, Response, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use utoipa::{OpenApi, ToSchema};

use teamflow_core::error::{ErrorKind, TeamflowError};
use teamflow_core::iso19115::MetadataBuilder;
use teamflow_core::workflow::WorkflowOrchestrator;

/// Application state
pub struct AppState {
    pub orchestrator: WorkflowOrchestrator,
    pub metadata: MetadataBuilder,
}

pub type SharedState = Arc<AppState>;

/// Error body returned by every failing route
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Upper-case error code, e.g. `INPUT_INVALID`
    pub code: String,
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: String,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: ErrorKind::InputInvalid.code().to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "NOT_FOUND".to_string(),
            message: message.into(),
        }
    }
}

impl From<TeamflowError> for ApiError {
    fn from(err: TeamflowError) -> Self {
        let status = match err.kind() {
            ErrorKind::InputInvalid => StatusCode::BAD_REQUEST,
            ErrorKind::TransientUpstream | ErrorKind::PermanentUpstream => StatusCode::BAD_GATEWAY,
            ErrorKind::Timeout | ErrorKind::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::InternalInvariant => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            code: err.kind().code().to_string(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        if self.status.is_server_error() {
            tracing::error!(code = %self.code, error = %self.message, "Request failed");
        }
        (
            self.status,
            Json(ErrorBody {
                code: self.code,
                error: self.message,
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

// === OpenAPI Definition ===

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Teamflow API",
        version = "0.1.0",
        description = "Run multi-team agent workflows and browse their archived outputs"
    ),
    paths(
        workflows::run_workflow,
        workflows::list_kinds,
        runs::list_runs,
        runs::runs_summary,
        runs::get_run,
        runs::memory_topics,
        iso::build_record,
        iso::validate_record
    ),
    components(
        schemas(
            ErrorBody,
            workflows::HistoryEntry,
            workflows::RunWorkflowRequest,
            workflows::RunWorkflowResponse,
            workflows::TeamOutputResponse,
            workflows::RunErrorResponse,
            workflows::WorkflowKindInfo,
            runs::RunSummaryResponse,
            runs::ArchiveSummaryResponse,
            runs::RunDetailResponse,
            runs::ArchivedTeamResponse,
            runs::TopicsResponse,
            iso::IsoBuildRequest,
            iso::IsoBuildResponse,
            iso::IsoValidateRequest,
            iso::ValidationReportResponse
        )
    ),
    tags(
        (name = "workflows", description = "Workflow execution"),
        (name = "runs", description = "Output archive"),
        (name = "memory", description = "Cross-run memory"),
        (name = "iso19115", description = "ISO 19115 metadata engine")
    )
)]
pub struct ApiDoc;

async fn serve_openapi() -> impl IntoResponse {
    match ApiDoc::openapi().to_pretty_json() {
        Ok(spec) => Response::builder()
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(spec))
            .map(IntoResponse::into_response)
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

pub fn router(state: SharedState) -> Router {
    let workflow_routes = Router::new()
        .route("/", post(workflows::run_workflow))
        .route("/kinds", get(workflows::list_kinds));

    let run_routes = Router::new()
        .route("/", get(runs::list_runs))
        .route("/summary", get(runs::runs_summary))
        .route("/:run_id", get(runs::get_run));

    let iso_routes = Router::new()
        .route("/build", post(iso::build_record))
        .route("/validate", post(iso::validate_record));

    Router::new()
        .nest("/api/v1/workflows", workflow_routes)
        .nest("/api/v1/runs", run_routes)
        .nest("/api/v1/iso19115", iso_routes)
        .route("/api/v1/memory/topics", get(runs::memory_topics))
        .route("/api/v1/openapi.json", get(serve_openapi))
        .with_state(state)
}

pub async fn serve(state: SharedState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = router(state);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Teamflow server listening");
    println!("🚀 Teamflow Server running at http://{}", addr);
    println!("   Workflows: /api/v1/workflows (POST), /api/v1/workflows/kinds");
    println!("   Runs:      /api/v1/runs, /api/v1/runs/summary, /api/v1/runs/:run_id");
    println!("   Memory:    /api/v1/memory/topics");
    println!("   ISO 19115: /api/v1/iso19115/build, /api/v1/iso19115/validate");
    println!("   OpenAPI:   /api/v1/openapi.json");
    axum::serve(listener, app).await?;
    Ok(())
}
