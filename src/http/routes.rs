use super::handlers;
use super::state::AppState;
use super::ws;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Catalog and job control
        .route("/api/download_options", post(handlers::download_options))
        .route("/api/download_video", post(handlers::download_video))
        .route("/api/jobs/:session_id", get(handlers::job_status))
        // Per-session progress events
        .route("/events", get(ws::events))
        // Locally published artifacts
        .route("/save_video/:filename", get(handlers::save_video))
        // Browser clients are served from another origin
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
