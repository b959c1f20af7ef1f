use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Label a provider uses when it cannot describe a stream
pub const UNKNOWN_LABEL: &str = "unknown";

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The URL could not be resolved into a video
    #[error("{0}")]
    InvalidSource(String),

    #[error("stream {0} is not offered for this video")]
    MissingStream(String),

    #[error("transfer failed: {0}")]
    Transfer(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which tracks a stream carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenditionKind {
    /// Audio and video multiplexed together
    Progressive,
    AudioOnly,
    VideoOnly,
}

/// One stream as enumerated by the provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderStream {
    /// Opaque stream handle
    pub id: String,
    /// Display resolution or bitrate, `UNKNOWN_LABEL` when absent
    pub label: String,
    pub mime_type: String,
    /// Container extension without the dot
    pub extension: String,
    pub size_bytes: Option<u64>,
}

/// Descriptive metadata of a resolved video
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub thumbnail_url: Option<String>,
    /// Duration in seconds
    pub length_secs: u64,
}

/// Result of resolving a URL: metadata plus the three stream enumerations
#[derive(Debug, Clone, Default)]
pub struct ProviderVideo {
    pub metadata: VideoMetadata,
    pub progressive: Vec<ProviderStream>,
    pub audio_only: Vec<ProviderStream>,
    pub video_only: Vec<ProviderStream>,
}

/// Called after every chunk with `(bytes_downloaded, total_bytes)`
pub type ChunkCallback<'a> = &'a mut (dyn FnMut(u64, Option<u64>) + Send);

/// Resolves video URLs and transfers stream bytes
#[async_trait]
pub trait StreamProvider: Send + Sync {
    /// Enumerate the streams behind `url`
    async fn resolve(&self, url: &str) -> Result<ProviderVideo, ProviderError>;

    /// Download stream `stream_id` of `url` into `dest`, returning the number
    /// of bytes written
    async fn download(
        &self,
        url: &str,
        stream_id: &str,
        dest: &Path,
        on_chunk: ChunkCallback<'_>,
    ) -> Result<u64, ProviderError>;
}
