//! Artifact publishing
//!
//! - `ArtifactStore`: the blob store seam (Cloudinary or a local directory)
//! - `ArtifactGateway`: uploads, best-effort eviction, and the single
//!   previous-artifact slot

pub mod cloudinary;
pub mod gateway;
pub mod local;

pub use cloudinary::CloudinaryStore;
pub use gateway::{
    ArtifactGateway, ArtifactStore, DestroyOutcome, PreviousArtifact, StoreError, StoredArtifact,
    VIDEO_RESOURCE,
};
pub use local::LocalStore;
