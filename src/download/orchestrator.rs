use super::files::{purge_session_files, sanitize_title, session_file_path};
use super::progress::ProgressTracker;
use crate::catalog::{CatalogStore, RenditionDescriptor, SelectorOutOfRange};
use crate::events::ProgressEvent;
use crate::provider::StreamProvider;
use crate::session::{JobLease, JobReporter, JobState, RegistryError, SessionId, SessionRegistry};
use crate::store::{ArtifactGateway, VIDEO_RESOURCE};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartJobError {
    #[error(transparent)]
    SelectorOutOfRange(#[from] SelectorOutOfRange),

    /// The catalog was rebuilt for another video since the client listed it
    #[error("download link {requested} does not match the current catalog ({catalog})")]
    SourceMismatch { requested: String, catalog: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// A job that has been accepted and is running in the background
#[derive(Debug)]
pub struct StartedJob {
    pub session_id: SessionId,
    pub rendition_index: usize,

    /// Resolves to the terminal state once cleanup has finished
    pub completion: JoinHandle<JobState>,
}

/// What a job needs once it leaves the request path
struct JobSpec {
    source_url: String,
    title: String,
    rendition: RenditionDescriptor,
}

struct Delivered {
    url: String,
    size_bytes: u64,
}

/// Runs download → upload pipelines, one background task per session
#[derive(Clone)]
pub struct DownloadOrchestrator {
    inner: Arc<OrchestratorInner>,
}

struct OrchestratorInner {
    provider: Arc<dyn StreamProvider>,
    gateway: Arc<ArtifactGateway>,
    catalogs: Arc<CatalogStore>,
    registry: SessionRegistry,
    download_dir: PathBuf,
}

impl DownloadOrchestrator {
    pub fn new(
        provider: Arc<dyn StreamProvider>,
        gateway: Arc<ArtifactGateway>,
        catalogs: Arc<CatalogStore>,
        registry: SessionRegistry,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            inner: Arc::new(OrchestratorInner {
                provider,
                gateway,
                catalogs,
                registry,
                download_dir: download_dir.into(),
            }),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.inner.registry
    }

    /// Validate the selector, mint a session and hand the job to a background
    /// task. Returns as soon as the job is registered.
    ///
    /// An out-of-range selector, or a `saved_link` naming a different video
    /// than the current catalog, is rejected here with no session, no job
    /// record and no events. An empty `saved_link` skips the source check.
    pub async fn start_job(
        &self,
        saved_link: &str,
        rendition_index: usize,
    ) -> Result<StartedJob, StartJobError> {
        let (catalog, rendition) = self.inner.catalogs.select(rendition_index).await?;

        if !saved_link.is_empty() && saved_link != catalog.source_url {
            return Err(StartJobError::SourceMismatch {
                requested: saved_link.to_string(),
                catalog: catalog.source_url.clone(),
            });
        }

        let session_id = SessionId::new();
        let lease = self.inner.registry.register(session_id, rendition.id.clone())?;

        info!(
            "Session {}: queued rendition #{} ({} {})",
            session_id, rendition_index, rendition.label, rendition.mime_type
        );

        let job = JobSpec {
            source_url: catalog.source_url.clone(),
            title: catalog.metadata.title.clone(),
            rendition,
        };
        let completion = tokio::spawn(supervise(Arc::clone(&self.inner), lease, job));

        Ok(StartedJob {
            session_id,
            rendition_index,
            completion,
        })
    }
}

/// Owns the job's lease for its whole life and guarantees the terminal
/// sequence: ready (or error), processing-status false, file purge, release.
async fn supervise(inner: Arc<OrchestratorInner>, lease: JobLease, job: JobSpec) -> JobState {
    let session_id = lease.session_id();
    let reporter = lease.reporter();

    let slot = match lease.acquire_slot().await {
        Ok(permit) => Some(permit),
        Err(e) => {
            warn!("Session {}: running without a job slot: {}", session_id, e);
            None
        }
    };

    // Run in a separate task so a panic is caught at the join point
    let pipeline = tokio::spawn(run_pipeline(Arc::clone(&inner), reporter.clone(), job));

    let state = match pipeline.await {
        Ok(Ok(delivered)) => {
            info!("Session {}: ready at {}", session_id, delivered.url);
            reporter.publish(ProgressEvent::delivered(delivered.url, delivered.size_bytes));
            JobState::Ready
        }
        Ok(Err(e)) => {
            error!("Session {}: job failed: {:#}", session_id, e);
            reporter.publish(ProgressEvent::failed(format!("{:#}", e)));
            JobState::Failed
        }
        Err(e) => {
            error!("Session {}: job task aborted: {}", session_id, e);
            reporter.publish(ProgressEvent::failed("download job aborted unexpectedly"));
            JobState::Failed
        }
    };
    reporter.set_state(state);
    reporter.publish(ProgressEvent::processing(false));

    match purge_session_files(&inner.download_dir, session_id).await {
        Ok(removed) => info!("Session {}: removed {} local file(s)", session_id, removed),
        Err(e) => warn!("Session {}: could not clean download directory: {}", session_id, e),
    }

    drop(slot);
    drop(lease);
    state
}

async fn run_pipeline(
    inner: Arc<OrchestratorInner>,
    reporter: JobReporter,
    job: JobSpec,
) -> Result<Delivered> {
    let session_id = reporter.session_id();

    inner.gateway.evict_previous().await;

    reporter.set_state(JobState::Downloading);
    tokio::fs::create_dir_all(&inner.download_dir)
        .await
        .context("Failed to create download directory")?;
    let dest = session_file_path(
        &inner.download_dir,
        &job.title,
        session_id,
        &job.rendition.extension,
    );

    let size_hint = job.rendition.size_bytes;
    let mut tracker = ProgressTracker::new();
    let mut on_chunk = |downloaded: u64, total: Option<u64>| {
        if let Some(percent) = tracker.observe(downloaded, total.or(size_hint)) {
            reporter.publish(ProgressEvent::progress(percent));
        }
    };

    let downloaded = inner
        .provider
        .download(&job.source_url, &job.rendition.id, &dest, &mut on_chunk)
        .await
        .context("Download failed")?;

    reporter.set_state(JobState::Uploading);
    let public_id = match sanitize_title(&job.title) {
        id if id.is_empty() => session_id.to_string(),
        id => id,
    };
    let stored = inner
        .gateway
        .upload(&dest, &public_id, VIDEO_RESOURCE)
        .await
        .context("Upload failed")?;

    Ok(Delivered {
        url: stored.url,
        size_bytes: downloaded,
    })
}
