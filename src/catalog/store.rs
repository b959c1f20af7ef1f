use super::descriptor::{RenditionCatalog, RenditionDescriptor};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("rendition index {index} is out of range (catalog has {len} entries)")]
pub struct SelectorOutOfRange {
    pub index: usize,
    pub len: usize,
}

/// Holds the most recently built catalog.
///
/// A rebuild swaps the whole catalog; readers keep whatever `Arc` they
/// already hold.
#[derive(Default)]
pub struct CatalogStore {
    current: RwLock<Option<Arc<RenditionCatalog>>>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn replace(&self, catalog: Arc<RenditionCatalog>) {
        *self.current.write().await = Some(catalog);
    }

    /// Drop the installed catalog so no selector resolves until a rebuild
    /// succeeds
    pub async fn clear(&self) {
        self.current.write().await.take();
    }

    pub async fn current(&self) -> Option<Arc<RenditionCatalog>> {
        self.current.read().await.clone()
    }

    /// Resolve a public selector against the current catalog
    pub async fn select(
        &self,
        index: usize,
    ) -> Result<(Arc<RenditionCatalog>, RenditionDescriptor), SelectorOutOfRange> {
        let current = self.current.read().await;
        let catalog = current
            .as_ref()
            .ok_or(SelectorOutOfRange { index, len: 0 })?;
        let descriptor = catalog.get(index).cloned().ok_or(SelectorOutOfRange {
            index,
            len: catalog.len(),
        })?;
        Ok((Arc::clone(catalog), descriptor))
    }
}
