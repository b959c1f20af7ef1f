use super::gateway::{ArtifactStore, DestroyOutcome, StoreError, StoredArtifact};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

/// Publishes artifacts into a local directory served by `/save_video`
pub struct LocalStore {
    directory: PathBuf,
    public_base_url: String,
}

impl LocalStore {
    pub fn new(directory: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn object_name(local_path: &Path, public_id: &str) -> String {
        match local_path.extension() {
            Some(ext) => format!("{}.{}", public_id, ext.to_string_lossy()),
            None => public_id.to_string(),
        }
    }
}

#[async_trait]
impl ArtifactStore for LocalStore {
    async fn upload(
        &self,
        local_path: &Path,
        public_id: &str,
        resource_kind: &str,
    ) -> Result<StoredArtifact, StoreError> {
        if public_id.is_empty() || public_id.contains(['/', '\\']) || public_id.starts_with('.') {
            return Err(StoreError::Rejected(format!("invalid public id '{}'", public_id)));
        }

        tokio::fs::create_dir_all(&self.directory).await?;
        let name = Self::object_name(local_path, public_id);
        let target = self.directory.join(&name);
        let size_bytes = tokio::fs::copy(local_path, &target).await?;

        info!("Published {} ({} bytes)", target.display(), size_bytes);

        Ok(StoredArtifact {
            url: format!("{}/save_video/{}", self.public_base_url, name),
            store_id: name,
            resource_kind: resource_kind.to_string(),
            size_bytes,
        })
    }

    async fn destroy(
        &self,
        store_id: &str,
        _resource_kind: &str,
    ) -> Result<DestroyOutcome, StoreError> {
        match tokio::fs::remove_file(self.directory.join(store_id)).await {
            Ok(()) => Ok(DestroyOutcome::Destroyed),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(DestroyOutcome::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}
