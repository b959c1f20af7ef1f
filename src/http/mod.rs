//! HTTP API server for the browser client
//!
//! - POST /api/download_options - Build the rendition catalog for a URL
//! - POST /api/download_video - Start a download job, returns its session id
//! - GET /api/jobs/:session_id - Query a running job
//! - GET /events?sessionId=<id> - WebSocket stream of a session's events
//! - GET /save_video/:filename - Download a locally published artifact
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;
mod ws;

pub use handlers::{DownloadOptionsResponse, DownloadVideoResponse, ErrorResponse, RenditionEntry};
pub use routes::create_router;
pub use state::AppState;
