use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Resource kind every downloaded rendition is stored under
pub const VIDEO_RESOURCE: &str = "video";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store rejected the request: {0}")]
    Rejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An object held by the blob store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviousArtifact {
    pub store_id: String,
    pub resource_kind: String,
}

/// Outcome of a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub url: String,
    pub store_id: String,
    pub resource_kind: String,
    pub size_bytes: u64,
}

impl StoredArtifact {
    pub fn as_previous(&self) -> PreviousArtifact {
        PreviousArtifact {
            store_id: self.store_id.clone(),
            resource_kind: self.resource_kind.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyOutcome {
    Destroyed,
    NotFound,
}

/// Blob store holding published artifacts
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn upload(
        &self,
        local_path: &Path,
        public_id: &str,
        resource_kind: &str,
    ) -> Result<StoredArtifact, StoreError>;

    async fn destroy(
        &self,
        store_id: &str,
        resource_kind: &str,
    ) -> Result<DestroyOutcome, StoreError>;
}

/// Front door to the blob store and the only writer of the
/// previous-artifact slot.
///
/// The slot is process-wide: at most one uploaded artifact stays live, and
/// every read-modify-write of it happens under `previous`.
pub struct ArtifactGateway {
    store: Arc<dyn ArtifactStore>,
    previous: Mutex<Option<PreviousArtifact>>,
}

impl ArtifactGateway {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            store,
            previous: Mutex::new(None),
        }
    }

    /// Destroy and clear the previous artifact. Failures are logged only.
    pub async fn evict_previous(&self) {
        let mut previous = self.previous.lock().await;
        if let Some(artifact) = previous.take() {
            self.destroy_logged(&artifact).await;
        }
    }

    /// Upload `local_path` and record it as the previous artifact.
    ///
    /// Normally the slot is empty here because the job evicted it first. If
    /// an overlapping job recorded its upload in the meantime, that artifact
    /// is destroyed now so only one stays live.
    pub async fn upload(
        &self,
        local_path: &Path,
        public_id: &str,
        resource_kind: &str,
    ) -> Result<StoredArtifact, StoreError> {
        let stored = self
            .store
            .upload(local_path, public_id, resource_kind)
            .await?;
        info!("Uploaded {} as {}", local_path.display(), stored.store_id);

        let mut previous = self.previous.lock().await;
        if let Some(displaced) = previous.replace(stored.as_previous()) {
            // Another job recorded its upload after this one evicted the slot
            if displaced != stored.as_previous() {
                warn!("Replacing unevicted artifact {}", displaced.store_id);
                self.destroy_logged(&displaced).await;
            }
        }

        Ok(stored)
    }

    pub async fn previous(&self) -> Option<PreviousArtifact> {
        self.previous.lock().await.clone()
    }

    async fn destroy_logged(&self, artifact: &PreviousArtifact) {
        match self
            .store
            .destroy(&artifact.store_id, &artifact.resource_kind)
            .await
        {
            Ok(DestroyOutcome::Destroyed) => info!("Destroyed artifact {}", artifact.store_id),
            Ok(DestroyOutcome::NotFound) => {
                warn!("Artifact {} was already gone", artifact.store_id)
            }
            Err(e) => warn!("Failed to destroy artifact {}: {}", artifact.store_id, e),
        }
    }
}
