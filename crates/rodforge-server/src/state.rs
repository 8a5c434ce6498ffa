//! Shared application state and request/response types for the HTTP API.

use rodforge_jobs::{JobOrchestrator, Stage};
use serde::{Deserialize, Serialize};

/// Shared application state.
///
/// The orchestrator is itself a cheap handle over shared state, so cloning
/// `AppState` per request copies a pointer, not the job machinery.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: JobOrchestrator,
}

impl AppState {
    pub fn new(orchestrator: JobOrchestrator) -> Self {
        Self { orchestrator }
    }
}

/// HTTP request payload for `POST /api/generate`.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    /// Natural-language description of the scene
    pub prompt: String,
}

/// HTTP response payload for `POST /api/generate`.
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub id: String,
    pub status: Stage,
    pub message: String,
}

/// HTTP response payload for `GET /api/status/:id`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: Stage,
    /// Failure message, present only when `status` is `failed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Where to fetch the animation, present only when `completed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gif_url: Option<String>,
}

/// Error body shared by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Whether the requested operation succeeded
    pub success: bool,
    /// Human-readable status or error message
    pub message: String,
}
