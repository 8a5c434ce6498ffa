//! Shared utility functions for the HTTP handlers.

use axum::http::StatusCode;
use axum::Json;
use rodforge_jobs::{JobError, JobId};
use tracing::error;

use crate::state::ApiResponse;

pub type ApiError = (StatusCode, Json<ApiResponse>);

/// Builds an error response with a consistent body.
pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ApiResponse {
            success: false,
            message: message.into(),
        }),
    )
}

/// Maps a job error onto an HTTP response.
///
/// Unknown and malformed ids are both `404`; anything else is logged and
/// reported as `500`.
pub fn job_error(err: JobError) -> ApiError {
    match err {
        JobError::NotFound(_) | JobError::InvalidId(_) => {
            api_error(StatusCode::NOT_FOUND, "Simulation ID not found")
        }
        other => {
            error!("{other}");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

/// Parses a path segment into a job id.
pub fn parse_id(raw: &str) -> Result<JobId, ApiError> {
    JobId::parse(raw).map_err(job_error)
}
