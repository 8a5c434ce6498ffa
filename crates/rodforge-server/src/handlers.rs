//! REST API handlers.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use rodforge_jobs::Stage;
use tracing::info;

use crate::helpers::{api_error, job_error, parse_id, ApiError};
use crate::state::{AppState, GenerateRequest, GenerateResponse, StatusResponse};

/// POST `/api/generate` - Creates a job and starts it in the background.
///
/// # Request Body
/// ```json
/// { "prompt": "a snake slithering on the ground" }
/// ```
///
/// # Response
/// - `200 OK` with `{id, status: "generating", message}`
/// - `400 BAD_REQUEST` if the prompt is empty
pub async fn generate_handler(
    State(state): State<AppState>,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let prompt = payload.prompt.trim();
    if prompt.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "prompt must not be empty"));
    }

    let job = state.orchestrator.submit(prompt).await.map_err(job_error)?;
    info!(job = %job.id, "generation requested");
    Ok(Json(GenerateResponse {
        id: job.id.to_string(),
        status: job.stage,
        message: "Simulation started in background.".to_string(),
    }))
}

/// GET `/api/status/:id` - Reports the job's current stage.
///
/// # Response
/// - `200 OK` with `{status, error?, gif_url?}`
/// - `404 NOT_FOUND` for unknown ids
pub async fn status_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let id = parse_id(&id)?;
    let job = state.orchestrator.status(&id).await.map_err(job_error)?;
    let gif_url = (job.stage == Stage::Completed).then(|| format!("/api/gif/{id}"));
    Ok(Json(StatusResponse {
        status: job.stage,
        error: job.last_error,
        gif_url,
    }))
}

/// GET `/api/gif/:id` - Returns the rendered animation.
///
/// # Response
/// - `200 OK` with `image/gif` bytes once the job has completed
/// - `400 BAD_REQUEST` if the job failed
/// - `404 NOT_FOUND` if the job is unknown or still running
pub async fn gif_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let job = state.orchestrator.status(&id).await.map_err(job_error)?;
    match job.stage {
        Stage::Completed => {}
        Stage::Failed => {
            let reason = job.last_error.unwrap_or_default();
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                format!("Simulation failed: {reason}"),
            ));
        }
        _ => return Err(api_error(StatusCode::NOT_FOUND, "GIF not ready yet")),
    }

    let bytes = tokio::fs::read(&job.artifacts.animation)
        .await
        .map_err(|e| api_error(StatusCode::NOT_FOUND, format!("GIF unavailable: {e}")))?;
    Ok(([(header::CONTENT_TYPE, "image/gif")], bytes))
}

/// GET `/api/code/:id` - Returns the generated simulation script.
///
/// # Response
/// - `200 OK` with the script as `text/plain` once compilation succeeded
/// - `404 NOT_FOUND` otherwise
pub async fn code_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<String, ApiError> {
    let id = parse_id(&id)?;
    let job = state.orchestrator.status(&id).await.map_err(job_error)?;
    tokio::fs::read_to_string(&job.artifacts.script)
        .await
        .map_err(|_| api_error(StatusCode::NOT_FOUND, "Code not found"))
}
