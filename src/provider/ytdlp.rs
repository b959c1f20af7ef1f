use super::traits::{
    ChunkCallback, ProviderError, ProviderStream, ProviderVideo, RenditionKind, StreamProvider,
    VideoMetadata, UNKNOWN_LABEL,
};
use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Provider backed by the `yt-dlp` extractor.
///
/// Metadata comes from `yt-dlp --dump-single-json`; bytes are fetched directly
/// from the format URL it reports, so progress is observed chunk by chunk.
pub struct YtDlpProvider {
    binary: PathBuf,
    resolve_timeout: Duration,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct DumpedVideo {
    #[serde(default)]
    title: String,
    thumbnail: Option<String>,
    duration: Option<f64>,
    #[serde(default)]
    formats: Vec<DumpedFormat>,
}

#[derive(Debug, Clone, Deserialize)]
struct DumpedFormat {
    format_id: String,
    #[serde(default)]
    ext: String,
    url: Option<String>,
    protocol: Option<String>,
    vcodec: Option<String>,
    acodec: Option<String>,
    height: Option<u64>,
    abr: Option<f64>,
    format_note: Option<String>,
    filesize: Option<u64>,
    filesize_approx: Option<u64>,
    #[serde(default)]
    http_headers: HashMap<String, String>,
}

impl DumpedFormat {
    fn has_video(&self) -> bool {
        self.vcodec.as_deref().is_some_and(|c| c != "none")
    }

    fn has_audio(&self) -> bool {
        self.acodec.as_deref().is_some_and(|c| c != "none")
    }

    /// Only plain HTTP(S) formats can be streamed straight to disk
    fn is_direct(&self) -> bool {
        self.url.is_some()
            && matches!(self.protocol.as_deref(), None | Some("http") | Some("https"))
    }

    fn kind(&self) -> Option<RenditionKind> {
        match (self.has_video(), self.has_audio()) {
            (true, true) => Some(RenditionKind::Progressive),
            (false, true) => Some(RenditionKind::AudioOnly),
            (true, false) => Some(RenditionKind::VideoOnly),
            (false, false) => None,
        }
    }

    fn label(&self, kind: RenditionKind) -> String {
        let label = match kind {
            RenditionKind::AudioOnly => self.abr.map(|abr| format!("{}kbps", abr.round() as u64)),
            _ => self
                .height
                .map(|h| format!("{}p", h))
                .or_else(|| self.format_note.clone()),
        };
        label
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
    }

    fn mime_type(&self, kind: RenditionKind) -> String {
        match (kind, self.ext.as_str()) {
            (RenditionKind::AudioOnly, "m4a") => "audio/mp4".to_string(),
            (RenditionKind::AudioOnly, "mp3") => "audio/mpeg".to_string(),
            (RenditionKind::AudioOnly, ext) => format!("audio/{}", ext),
            (_, ext) => format!("video/{}", ext),
        }
    }

    fn to_stream(&self, kind: RenditionKind) -> ProviderStream {
        ProviderStream {
            id: self.format_id.clone(),
            label: self.label(kind),
            mime_type: self.mime_type(kind),
            extension: self.ext.clone(),
            size_bytes: self.filesize.or(self.filesize_approx),
        }
    }
}

impl DumpedVideo {
    fn into_provider_video(self) -> ProviderVideo {
        let mut video = ProviderVideo {
            metadata: VideoMetadata {
                title: self.title,
                thumbnail_url: self.thumbnail,
                length_secs: self.duration.map(|d| d.max(0.0) as u64).unwrap_or(0),
            },
            ..ProviderVideo::default()
        };

        for format in self.formats.iter().filter(|f| f.is_direct()) {
            let Some(kind) = format.kind() else { continue };
            let stream = format.to_stream(kind);
            match kind {
                RenditionKind::Progressive => video.progressive.push(stream),
                RenditionKind::AudioOnly => video.audio_only.push(stream),
                RenditionKind::VideoOnly => video.video_only.push(stream),
            }
        }

        video
    }
}

impl YtDlpProvider {
    pub fn new(binary: impl Into<PathBuf>, resolve_timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            resolve_timeout,
            http: reqwest::Client::new(),
        }
    }

    async fn dump(&self, url: &str) -> Result<DumpedVideo, ProviderError> {
        info!("Resolving {} with {}", url, self.binary.display());

        let output = Command::new(&self.binary)
            .args([
                "--dump-single-json",
                "--no-warnings",
                "--no-playlist",
                "--skip-download",
                url,
            ])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.resolve_timeout, output)
            .await
            .map_err(|_| {
                ProviderError::InvalidSource(format!(
                    "timed out after {}s resolving {}",
                    self.resolve_timeout.as_secs(),
                    url
                ))
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("yt-dlp exited without output")
                .trim()
                .to_string();
            warn!("yt-dlp failed for {}: {}", url, reason);
            return Err(ProviderError::InvalidSource(reason));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            ProviderError::InvalidSource(format!("unreadable metadata for {}: {}", url, e))
        })
    }
}

#[async_trait]
impl StreamProvider for YtDlpProvider {
    async fn resolve(&self, url: &str) -> Result<ProviderVideo, ProviderError> {
        let video = self.dump(url).await?.into_provider_video();
        debug!(
            "Resolved '{}': {} progressive, {} audio, {} video streams",
            video.metadata.title,
            video.progressive.len(),
            video.audio_only.len(),
            video.video_only.len()
        );
        Ok(video)
    }

    async fn download(
        &self,
        url: &str,
        stream_id: &str,
        dest: &Path,
        on_chunk: ChunkCallback<'_>,
    ) -> Result<u64, ProviderError> {
        // Format URLs expire, so they are looked up fresh for every download
        let dumped = self.dump(url).await?;
        let format = dumped
            .formats
            .into_iter()
            .find(|f| f.format_id == stream_id && f.is_direct())
            .ok_or_else(|| ProviderError::MissingStream(stream_id.to_string()))?;
        let format_url = format
            .url
            .clone()
            .ok_or_else(|| ProviderError::MissingStream(stream_id.to_string()))?;

        let mut request = self.http.get(&format_url);
        for (name, value) in &format.http_headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?.error_for_status()?;
        let total = response
            .content_length()
            .or(format.filesize)
            .or(format.filesize_approx);

        info!("Downloading stream {} to {}", stream_id, dest.display());

        let mut file = BufWriter::new(tokio::fs::File::create(dest).await?);
        let mut downloaded = 0u64;
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            on_chunk(downloaded, total);
        }

        file.flush().await?;

        info!("Downloaded {} bytes for stream {}", downloaded, stream_id);

        Ok(downloaded)
    }
}
