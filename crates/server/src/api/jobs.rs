//! Conversion job API handlers.

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};
use transmute_core::{
    dispatcher::{DispatchError, SubmitRequest, ValidationError},
    job::{JobSnapshot, JobStatus},
};

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response for an accepted conversion
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub job_id: String,
}

/// Response for a status poll
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: JobStatus,
    pub progress: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl From<JobSnapshot> for StatusResponse {
    fn from(job: JobSnapshot) -> Self {
        let download_url =
            (job.status == JobStatus::Completed).then(|| format!("/api/v1/download/{}", job.id));
        Self {
            status: job.status,
            progress: job.progress,
            error: job.error_message,
            warning: job.warning_message,
            strategy_used: job.strategy_used,
            download_url,
        }
    }
}

/// One entry of the job listing
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: u32,
    pub source_format: String,
    pub destination_format: String,
    pub original_filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub created_at: String,
}

impl From<JobSnapshot> for JobSummary {
    fn from(job: JobSnapshot) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            progress: job.progress,
            source_format: job.source_format.to_string(),
            destination_format: job.destination_format.to_string(),
            original_filename: job.original_filename,
            error: job.error_message,
            warning: job.warning_message,
            created_at: job.created_at.to_rfc3339(),
        }
    }
}

/// Response for listing jobs
#[derive(Debug, Serialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<JobSummary>,
}

/// Response for a deletion
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn dispatch_error(err: DispatchError) -> ApiError {
    let status = match &err {
        DispatchError::Validation(ValidationError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
        DispatchError::Validation(_) => StatusCode::BAD_REQUEST,
        DispatchError::NotFound(_) | DispatchError::OutputMissing(_) => StatusCode::NOT_FOUND,
        DispatchError::NotReady { .. } => StatusCode::CONFLICT,
        DispatchError::NotRunning => StatusCode::SERVICE_UNAVAILABLE,
        DispatchError::Upload(_) | DispatchError::Storage { .. } => {
            error!(error = %err, "Storage failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    api_error(status, err.to_string())
}

/// Quotes and backslashes would break the header value.
fn attachment_header(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    format!("attachment; filename=\"{}\"", safe)
}

// ============================================================================
// Handlers
// ============================================================================

/// Accept a file for conversion (multipart: file, sourceFormat, destinationFormat)
pub async fn convert(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ConvertResponse>), ApiError> {
    let mut file: Option<(Vec<u8>, String)> = None;
    let mut source_format: Option<String> = None;
    let mut destination_format: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(api_error(e.status(), e.body_text())),
        };

        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| api_error(e.status(), e.body_text()))?;
                file = Some((bytes.to_vec(), filename));
            }
            "sourceFormat" => {
                source_format = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| api_error(e.status(), e.body_text()))?,
                );
            }
            "destinationFormat" => {
                destination_format = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| api_error(e.status(), e.body_text()))?,
                );
            }
            other => debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    let (bytes, filename) =
        file.ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Missing 'file' field"))?;
    let source_format = source_format
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Missing 'sourceFormat' field"))?;
    let destination_format = destination_format.ok_or_else(|| {
        api_error(StatusCode::BAD_REQUEST, "Missing 'destinationFormat' field")
    })?;

    let job_id = state
        .dispatcher()
        .submit(SubmitRequest::new(
            bytes,
            filename,
            source_format.trim(),
            destination_format.trim(),
        ))
        .await
        .map_err(dispatch_error)?;

    Ok((StatusCode::ACCEPTED, Json(ConvertResponse { job_id })))
}

/// Poll a job
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let job = state.dispatcher().status(&id).map_err(dispatch_error)?;
    Ok(Json(StatusResponse::from(job)))
}

/// Fetch the output of a completed job
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let file = state
        .dispatcher()
        .download(&id)
        .await
        .map_err(dispatch_error)?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, attachment_header(&file.filename)),
        ],
        Body::from(file.bytes),
    )
        .into_response())
}

/// Delete a job and its artifacts
pub async fn delete_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.dispatcher().delete(&id).await.map_err(dispatch_error)?;
    Ok(Json(MessageResponse {
        message: format!("Job {} deleted successfully", id),
    }))
}

/// List every known job, oldest first
pub async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<ListJobsResponse> {
    Json(ListJobsResponse {
        jobs: state
            .dispatcher()
            .list_jobs()
            .into_iter()
            .map(JobSummary::from)
            .collect(),
    })
}
