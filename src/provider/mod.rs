//! Video platform access: URL resolution and byte transfer

pub mod traits;
pub mod ytdlp;

pub use traits::{
    ChunkCallback, ProviderError, ProviderStream, ProviderVideo, RenditionKind, StreamProvider,
    VideoMetadata, UNKNOWN_LABEL,
};
pub use ytdlp::YtDlpProvider;
