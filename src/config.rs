use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub downloads: DownloadsConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadsConfig {
    /// Directory that holds in-flight, session-namespaced downloads
    pub directory: String,

    /// yt-dlp executable used to resolve video URLs
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: String,

    /// Upper bound for a single metadata lookup
    #[serde(default = "default_resolve_timeout_secs")]
    pub resolve_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    /// Jobs beyond this limit wait in `Pending` until a slot frees up
    pub max_concurrent: usize,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self { max_concurrent: 4 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    Cloudinary(CloudinaryConfig),
    Local(LocalStoreConfig),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,

    /// Files larger than this are sent in multiple ranged requests
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalStoreConfig {
    /// Directory that published artifacts are copied into
    pub directory: String,

    /// Base URL clients use to reach `/save_video/<file>`
    pub public_base_url: String,
}

fn default_ytdlp_path() -> String {
    "yt-dlp".to_string()
}

fn default_resolve_timeout_secs() -> u64 {
    120
}

fn default_chunk_size() -> u64 {
    20 * 1024 * 1024
}

impl Config {
    /// Load `path` (any format the `config` crate understands) and layer
    /// `VIDRELAY__SECTION__KEY` environment overrides on top.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("VIDRELAY").separator("__"))
            .build()
            .with_context(|| format!("Failed to read config from {}", path))?;

        Ok(settings.try_deserialize()?)
    }
}

impl DownloadsConfig {
    pub fn directory(&self) -> PathBuf {
        expand_dir(&self.directory)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }
}

impl LocalStoreConfig {
    pub fn directory(&self) -> PathBuf {
        expand_dir(&self.directory)
    }
}

fn expand_dir(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}
