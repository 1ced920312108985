//! # ISO 19115 API
//!
//! The metadata engine without any LLM involvement.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use teamflow_core::iso19115::{self, MetadataParams, ValidationReport};

use super::{ApiError, ApiResult, SharedState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct IsoBuildRequest {
    /// Build parameters: title, abstract, keywords, spatial_extent,
    /// temporal_extent, data_type, contact, resolution, lineage, ...
    #[schema(value_type = Object)]
    pub params: serde_json::Value,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidationReportResponse {
    pub valid: bool,
    pub missing: Vec<String>,
    pub issues: Vec<String>,
    pub total_issues: usize,
    pub parse_error: Option<String>,
    pub markdown: String,
}

impl From<ValidationReport> for ValidationReportResponse {
    fn from(report: ValidationReport) -> Self {
        let markdown = report.to_markdown();
        Self {
            valid: report.valid,
            missing: report.missing,
            issues: report.issues,
            total_issues: report.total_issues,
            parse_error: report.parse_error,
            markdown,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IsoBuildResponse {
    pub file_identifier: String,
    pub xml: String,
    pub report: ValidationReportResponse,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct IsoValidateRequest {
    pub xml: String,
}

/// Build, serialize and validate a record
#[utoipa::path(
    post,
    path = "/api/v1/iso19115/build",
    tag = "iso19115",
    request_body = IsoBuildRequest,
    responses(
        (status = 200, description = "Generated record", body = IsoBuildResponse),
        (status = 400, description = "Missing fields or invalid extents", body = super::ErrorBody)
    )
)]
pub async fn build_record(
    State(state): State<SharedState>,
    Json(req): Json<IsoBuildRequest>,
) -> ApiResult<IsoBuildResponse> {
    let params: MetadataParams = serde_json::from_value(req.params)
        .map_err(|e| ApiError::bad_request(format!("invalid metadata parameters: {}", e)))?;
    let generated = iso19115::generate(&state.metadata, &params)?;
    Ok(Json(IsoBuildResponse {
        file_identifier: generated.record.file_identifier.to_string(),
        xml: generated.xml,
        report: generated.report.into(),
    }))
}

/// Validate an ISO 19139 XML document
#[utoipa::path(
    post,
    path = "/api/v1/iso19115/validate",
    tag = "iso19115",
    request_body = IsoValidateRequest,
    responses(
        (status = 200, description = "Validation report; invalid documents are not an error", body = ValidationReportResponse)
    )
)]
pub async fn validate_record(Json(req): Json<IsoValidateRequest>) -> Json<ValidationReportResponse> {
    Json(iso19115::validate(req.xml.as_bytes()).into())
}
