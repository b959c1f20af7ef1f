// Shared fakes for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use vidrelay::provider::{
    ChunkCallback, ProviderError, ProviderStream, ProviderVideo, StreamProvider, VideoMetadata,
};
use vidrelay::store::{ArtifactStore, DestroyOutcome, StoreError, StoredArtifact};

pub fn stream(id: &str, label: &str, ext: &str) -> ProviderStream {
    ProviderStream {
        id: id.to_string(),
        label: label.to_string(),
        mime_type: format!("video/{}", ext),
        extension: ext.to_string(),
        size_bytes: None,
    }
}

pub fn sample_video() -> ProviderVideo {
    ProviderVideo {
        metadata: VideoMetadata {
            title: "Demo: Clip #1".to_string(),
            thumbnail_url: Some("https://img.test/demo.jpg".to_string()),
            length_secs: 42,
        },
        progressive: vec![stream("18", "360p", "mp4"), stream("22", "720p", "mp4")],
        audio_only: vec![stream("140", "128kbps", "m4a")],
        video_only: vec![stream("137", "1080p", "mp4")],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadBehavior {
    Succeed,
    /// Write part of the payload, then fail
    FailMidway,
    Panic,
}

/// Provider serving a fixed video and payload
pub struct FakeProvider {
    pub video: ProviderVideo,
    pub resolve_error: Option<String>,
    /// URLs that fail to resolve even when `resolve_error` is unset
    pub unavailable: Vec<String>,
    pub payload: Vec<u8>,
    pub chunk_size: usize,
    pub report_total: bool,
    pub behavior: DownloadBehavior,
    /// Downloads wait here until the test releases them
    pub gate: Arc<Notify>,
    pub resolve_calls: AtomicUsize,
    pub download_calls: AtomicUsize,
    pub destinations: Mutex<Vec<PathBuf>>,
}

impl FakeProvider {
    pub fn new(video: ProviderVideo) -> Self {
        Self {
            video,
            resolve_error: None,
            unavailable: Vec::new(),
            payload: vec![7u8; 1000],
            chunk_size: 100,
            report_total: true,
            behavior: DownloadBehavior::Succeed,
            gate: Arc::new(Notify::new()),
            resolve_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
            destinations: Mutex::new(Vec::new()),
        }
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl StreamProvider for FakeProvider {
    async fn resolve(&self, url: &str) -> Result<ProviderVideo, ProviderError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.iter().any(|u| u == url) {
            return Err(ProviderError::InvalidSource(format!("{} unavailable", url)));
        }
        match &self.resolve_error {
            Some(reason) => Err(ProviderError::InvalidSource(format!("{}: {}", url, reason))),
            None => Ok(self.video.clone()),
        }
    }

    async fn download(
        &self,
        _url: &str,
        _stream_id: &str,
        dest: &Path,
        on_chunk: ChunkCallback<'_>,
    ) -> Result<u64, ProviderError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        self.destinations.lock().unwrap().push(dest.to_path_buf());
        self.gate.notified().await;

        let total = self.payload.len() as u64;
        let mut written = Vec::new();
        for chunk in self.payload.chunks(self.chunk_size) {
            written.extend_from_slice(chunk);
            tokio::fs::write(dest, &written).await?;
            on_chunk(written.len() as u64, self.report_total.then_some(total));

            if written.len() * 2 >= self.payload.len() {
                match self.behavior {
                    DownloadBehavior::FailMidway => {
                        return Err(ProviderError::Io(std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            "connection reset by peer",
                        )))
                    }
                    DownloadBehavior::Panic => panic!("provider blew up"),
                    DownloadBehavior::Succeed => {}
                }
            }
        }

        Ok(written.len() as u64)
    }
}

/// Store that records every call
#[derive(Default)]
pub struct RecordingStore {
    pub fail_upload: bool,
    pub fail_destroy: bool,
    pub uploads: Mutex<Vec<(PathBuf, String, u64)>>,
    pub destroyed: Mutex<Vec<String>>,
}

impl RecordingStore {
    pub fn destroyed(&self) -> Vec<String> {
        self.destroyed.lock().unwrap().clone()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl ArtifactStore for RecordingStore {
    async fn upload(
        &self,
        local_path: &Path,
        public_id: &str,
        resource_kind: &str,
    ) -> Result<StoredArtifact, StoreError> {
        if self.fail_upload {
            return Err(StoreError::Rejected("quota exceeded".to_string()));
        }
        let size_bytes = tokio::fs::metadata(local_path).await?.len();
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push((local_path.to_path_buf(), public_id.to_string(), size_bytes));

        Ok(StoredArtifact {
            url: format!("https://cdn.test/{}/{}", uploads.len(), public_id),
            store_id: format!("{}-{}", public_id, uploads.len()),
            resource_kind: resource_kind.to_string(),
            size_bytes,
        })
    }

    async fn destroy(
        &self,
        store_id: &str,
        _resource_kind: &str,
    ) -> Result<DestroyOutcome, StoreError> {
        self.destroyed.lock().unwrap().push(store_id.to_string());
        if self.fail_destroy {
            return Err(StoreError::Rejected("store unavailable".to_string()));
        }
        Ok(DestroyOutcome::Destroyed)
    }
}
