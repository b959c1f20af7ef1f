pub mod catalog;
pub mod config;
pub mod download;
pub mod events;
pub mod http;
pub mod provider;
pub mod session;
pub mod store;

pub use catalog::{
    CatalogBuilder, CatalogError, CatalogStore, RenditionCatalog, RenditionDescriptor,
};
pub use config::Config;
pub use download::{DownloadOrchestrator, StartJobError, StartedJob};
pub use events::{Broadcaster, ProgressEvent, ReadyPayload};
pub use http::{create_router, AppState};
pub use provider::{ProviderError, StreamProvider, YtDlpProvider};
pub use session::{JobHandle, JobState, SessionId, SessionRegistry};
pub use store::{ArtifactGateway, ArtifactStore, CloudinaryStore, LocalStore, StoreError};
