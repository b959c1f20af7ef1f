use crate::provider::{ProviderStream, RenditionKind, VideoMetadata};
use serde::{Deserialize, Serialize};

/// One selectable rendition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenditionDescriptor {
    /// Provider stream handle
    pub id: String,
    pub label: String,
    pub mime_type: String,
    pub kind: RenditionKind,
    pub extension: String,
    pub size_bytes: Option<u64>,
}

impl RenditionDescriptor {
    pub fn from_stream(stream: ProviderStream, kind: RenditionKind) -> Self {
        Self {
            id: stream.id,
            label: stream.label,
            mime_type: stream.mime_type,
            kind,
            extension: stream.extension,
            size_bytes: stream.size_bytes,
        }
    }

    pub fn is_progressive(&self) -> bool {
        self.kind == RenditionKind::Progressive
    }
}

/// Deduplicated, indexed renditions of one source URL.
///
/// The position of a descriptor in `renditions` is its public selector.
#[derive(Debug, Clone, PartialEq)]
pub struct RenditionCatalog {
    pub source_url: String,
    pub metadata: VideoMetadata,
    renditions: Vec<RenditionDescriptor>,
}

impl RenditionCatalog {
    pub(crate) fn new(
        source_url: String,
        metadata: VideoMetadata,
        renditions: Vec<RenditionDescriptor>,
    ) -> Self {
        Self {
            source_url,
            metadata,
            renditions,
        }
    }

    pub fn renditions(&self) -> &[RenditionDescriptor] {
        &self.renditions
    }

    pub fn get(&self, index: usize) -> Option<&RenditionDescriptor> {
        self.renditions.get(index)
    }

    pub fn len(&self) -> usize {
        self.renditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renditions.is_empty()
    }
}
