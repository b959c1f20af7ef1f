use super::descriptor::{RenditionCatalog, RenditionDescriptor};
use super::store::CatalogStore;
use crate::provider::{
    ProviderError, ProviderVideo, RenditionKind, StreamProvider, VideoMetadata, UNKNOWN_LABEL,
};
use crate::store::ArtifactGateway;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid source: {0}")]
    InvalidSource(String),

    /// Nothing survived filtering. The (empty) catalog is still installed.
    #[error("no downloadable renditions for '{}'", .metadata.title)]
    EmptyCatalog { metadata: VideoMetadata },
}

impl From<ProviderError> for CatalogError {
    fn from(err: ProviderError) -> Self {
        CatalogError::InvalidSource(err.to_string())
    }
}

/// Turn the provider's three enumerations into an indexed catalog.
///
/// Passes run progressive → audio-only → video-only. Within and across passes
/// the first occurrence of a stream handle wins; entries with an unknown label
/// are dropped after deduplication.
pub fn build_catalog(source_url: &str, video: ProviderVideo) -> RenditionCatalog {
    let passes = [
        (RenditionKind::Progressive, video.progressive),
        (RenditionKind::AudioOnly, video.audio_only),
        (RenditionKind::VideoOnly, video.video_only),
    ];

    let mut seen = HashSet::new();
    let renditions = passes
        .into_iter()
        .flat_map(|(kind, streams)| streams.into_iter().map(move |s| (kind, s)))
        .filter(|(_, stream)| seen.insert(stream.id.clone()))
        .filter(|(_, stream)| has_known_label(&stream.label))
        .map(|(kind, stream)| RenditionDescriptor::from_stream(stream, kind))
        .collect();

    RenditionCatalog::new(source_url.to_string(), video.metadata, renditions)
}

fn has_known_label(label: &str) -> bool {
    let label = label.trim();
    !label.is_empty() && !label.eq_ignore_ascii_case(UNKNOWN_LABEL) && label != "None"
}

/// Rebuilds the process-wide catalog on request
pub struct CatalogBuilder {
    provider: Arc<dyn StreamProvider>,
    gateway: Arc<ArtifactGateway>,
    catalogs: Arc<CatalogStore>,
}

impl CatalogBuilder {
    pub fn new(
        provider: Arc<dyn StreamProvider>,
        gateway: Arc<ArtifactGateway>,
        catalogs: Arc<CatalogStore>,
    ) -> Self {
        Self {
            provider,
            gateway,
            catalogs,
        }
    }

    /// Evict the previous artifact, discard the current catalog, then resolve
    /// `url` and install a fresh one. A failed resolve leaves no catalog.
    pub async fn rebuild(&self, url: &str) -> Result<Arc<RenditionCatalog>, CatalogError> {
        // Best-effort; never blocks catalog construction
        self.gateway.evict_previous().await;
        self.catalogs.clear().await;

        let video = self.provider.resolve(url).await?;
        let catalog = Arc::new(build_catalog(url, video));
        self.catalogs.replace(Arc::clone(&catalog)).await;

        if catalog.is_empty() {
            warn!("No usable renditions for {}", url);
            return Err(CatalogError::EmptyCatalog {
                metadata: catalog.metadata.clone(),
            });
        }

        info!(
            "Catalog for '{}' has {} renditions",
            catalog.metadata.title,
            catalog.len()
        );
        Ok(catalog)
    }
}
