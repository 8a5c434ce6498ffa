//! rodforge HTTP server library - exports the router for the binary and
//! tests.

pub mod handlers;
pub mod helpers;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use state::AppState;

use handlers::{code_handler, generate_handler, gif_handler, status_handler};

/// Builds the application router. Every route lives under `/api`.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/generate", post(generate_handler))
        .route("/status/:id", get(status_handler))
        .route("/gif/:id", get(gif_handler))
        .route("/code/:id", get(code_handler));

    Router::new()
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
