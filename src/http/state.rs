use crate::catalog::{CatalogBuilder, CatalogStore};
use crate::config::{Config, StoreConfig};
use crate::download::DownloadOrchestrator;
use crate::provider::{StreamProvider, YtDlpProvider};
use crate::session::SessionRegistry;
use crate::store::{ArtifactGateway, ArtifactStore, CloudinaryStore, LocalStore};
use std::path::PathBuf;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogBuilder>,
    pub orchestrator: DownloadOrchestrator,

    /// Directory served by `/save_video`, when artifacts are published locally
    pub published_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn StreamProvider>,
        store: Arc<dyn ArtifactStore>,
        download_dir: impl Into<PathBuf>,
        max_concurrent_jobs: usize,
        published_dir: Option<PathBuf>,
    ) -> Self {
        let gateway = Arc::new(ArtifactGateway::new(store));
        let catalogs = Arc::new(CatalogStore::new());
        let registry = SessionRegistry::new(max_concurrent_jobs);

        let catalog = Arc::new(CatalogBuilder::new(
            Arc::clone(&provider),
            Arc::clone(&gateway),
            Arc::clone(&catalogs),
        ));
        let orchestrator =
            DownloadOrchestrator::new(provider, gateway, catalogs, registry, download_dir);

        Self {
            catalog,
            orchestrator,
            published_dir,
        }
    }

    /// Wire the yt-dlp provider and the configured store backend
    pub fn from_config(cfg: &Config) -> Self {
        let provider: Arc<dyn StreamProvider> = Arc::new(YtDlpProvider::new(
            &cfg.downloads.ytdlp_path,
            cfg.downloads.resolve_timeout(),
        ));

        let (store, published_dir): (Arc<dyn ArtifactStore>, _) = match &cfg.store {
            StoreConfig::Cloudinary(cloudinary) => {
                (Arc::new(CloudinaryStore::new(cloudinary.clone())), None)
            }
            StoreConfig::Local(local) => {
                let dir = local.directory();
                (
                    Arc::new(LocalStore::new(dir.clone(), local.public_base_url.clone())),
                    Some(dir),
                )
            }
        };

        Self::new(
            provider,
            store,
            cfg.downloads.directory(),
            cfg.jobs.max_concurrent,
            published_dir,
        )
    }

    pub fn registry(&self) -> &SessionRegistry {
        self.orchestrator.registry()
    }
}
