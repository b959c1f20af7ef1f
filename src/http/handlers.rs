use super::state::AppState;
use crate::catalog::{CatalogError, RenditionDescriptor};
use crate::download::StartJobError;
use crate::provider::VideoMetadata;
use crate::session::{JobHandle, SessionId};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DownloadOptionsRequest {
    #[serde(rename = "inputLink")]
    pub input_link: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RenditionEntry {
    /// Public selector: the rendition's position in the catalog
    pub itag: usize,
    pub res: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub progressive: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DownloadOptionsResponse {
    pub available_resolutions: Vec<RenditionEntry>,
    pub thumbnail_url: Option<String>,
    pub video_title: String,
    pub video_length: u64,
}

#[derive(Debug, Deserialize)]
pub struct DownloadVideoRequest {
    #[serde(rename = "resolutionIndex")]
    pub resolution_index: usize,

    #[serde(rename = "savedLink", default)]
    pub saved_link: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DownloadVideoResponse {
    pub resolution_index: usize,
    pub session_id: SessionId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl DownloadOptionsResponse {
    fn new(metadata: &VideoMetadata, renditions: &[RenditionDescriptor]) -> Self {
        Self {
            available_resolutions: renditions
                .iter()
                .enumerate()
                .map(|(itag, r)| RenditionEntry {
                    itag,
                    res: r.label.clone(),
                    mime_type: r.mime_type.clone(),
                    progressive: r.is_progressive(),
                })
                .collect(),
            thumbnail_url: metadata.thumbnail_url.clone(),
            video_title: metadata.title.clone(),
            video_length: metadata.length_secs,
        }
    }
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/download_options
/// Rebuild the rendition catalog for a video URL
pub async fn download_options(
    State(state): State<AppState>,
    Json(req): Json<DownloadOptionsRequest>,
) -> impl IntoResponse {
    info!("Building catalog for {}", req.input_link);

    match state.catalog.rebuild(&req.input_link).await {
        Ok(catalog) => (
            StatusCode::OK,
            Json(DownloadOptionsResponse::new(
                &catalog.metadata,
                catalog.renditions(),
            )),
        )
            .into_response(),
        Err(CatalogError::EmptyCatalog { metadata }) => {
            (StatusCode::OK, Json(DownloadOptionsResponse::new(&metadata, &[]))).into_response()
        }
        Err(e @ CatalogError::InvalidSource(_)) => {
            warn!("Rejected {}: {}", req.input_link, e);
            error_response(StatusCode::BAD_REQUEST, e)
        }
    }
}

/// POST /api/download_video
/// Start a background download job for one catalog entry
pub async fn download_video(
    State(state): State<AppState>,
    Json(req): Json<DownloadVideoRequest>,
) -> impl IntoResponse {
    match state
        .orchestrator
        .start_job(&req.saved_link, req.resolution_index)
        .await
    {
        // The job owns its own completion; the request does not wait for it
        Ok(job) => (
            StatusCode::OK,
            Json(DownloadVideoResponse {
                resolution_index: job.rendition_index,
                session_id: job.session_id,
            }),
        )
            .into_response(),
        Err(e @ StartJobError::SelectorOutOfRange(_)) => {
            warn!("Rejected download request: {}", e);
            error_response(StatusCode::BAD_REQUEST, e)
        }
        Err(e @ StartJobError::SourceMismatch { .. }) => {
            warn!("Rejected download request: {}", e);
            error_response(StatusCode::CONFLICT, e)
        }
        Err(e @ StartJobError::Registry(_)) => {
            error!("Failed to register job: {}", e);
            error_response(StatusCode::CONFLICT, e)
        }
    }
}

/// GET /save_video/:filename
/// Stream a locally published artifact as an attachment
pub async fn save_video(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> impl IntoResponse {
    let Some(dir) = state.published_dir.as_ref() else {
        return error_response(StatusCode::NOT_FOUND, "local publishing is disabled");
    };

    if filename.is_empty() || filename.contains(['/', '\\']) || filename.starts_with('.') {
        return error_response(StatusCode::BAD_REQUEST, "invalid file name");
    }

    let path = dir.join(&filename);
    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(_) => {
            return error_response(StatusCode::NOT_FOUND, format!("{} not found", filename))
        }
    };

    let mut response = Body::from_stream(ReaderStream::new(file)).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/octet-stream"),
    );
    let disposition = format!("attachment; filename=\"{}\"", filename.replace('"', ""));
    if let Ok(value) = disposition.parse::<header::HeaderValue>() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

/// GET /api/jobs/:session_id
/// Current state of a session's job, while it is registered
pub async fn job_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let Ok(session_id) = session_id.parse::<SessionId>() else {
        return error_response(StatusCode::BAD_REQUEST, "invalid session id");
    };

    match state.registry().job(session_id) {
        Some(job) => (StatusCode::OK, Json::<JobHandle>(job)).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("No active job for session {}", session_id),
        ),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
