use super::gateway::{ArtifactStore, DestroyOutcome, StoreError, StoredArtifact};
use crate::config::CloudinaryConfig;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, info};

const DEFAULT_API_BASE: &str = "https://api.cloudinary.com";

/// Cloudinary upload API client with SHA-256 request signing
pub struct CloudinaryStore {
    config: CloudinaryConfig,
    api_base: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: Option<String>,
    url: String,
    #[serde(default)]
    bytes: u64,
    resource_type: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl CloudinaryStore {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self::with_api_base(config, DEFAULT_API_BASE)
    }

    pub fn with_api_base(config: CloudinaryConfig, api_base: impl Into<String>) -> Self {
        Self {
            config,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, resource_kind: &str, action: &str) -> String {
        format!(
            "{}/v1_1/{}/{}/{}",
            self.api_base, self.config.cloud_name, resource_kind, action
        )
    }

    /// Parameters every signed request carries, signature included
    fn signed_params(
        &self,
        mut params: BTreeMap<&'static str, String>,
    ) -> BTreeMap<&'static str, String> {
        params.insert("timestamp", chrono::Utc::now().timestamp().to_string());
        let signature = sign(&params, &self.config.api_secret);
        params.insert("signature", signature);
        params.insert("signature_algorithm", "sha256".to_string());
        params.insert("api_key", self.config.api_key.clone());
        params
    }

    fn form(params: &BTreeMap<&'static str, String>, chunk: Vec<u8>, file_name: &str) -> Form {
        let form = params
            .iter()
            .fold(Form::new(), |form, (key, value)| form.text(*key, value.clone()));
        form.part("file", Part::bytes(chunk).file_name(file_name.to_string()))
    }

    async fn read_response<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, StoreError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(StoreError::Rejected(format!("{}: {}", status, message)));
        }
        Ok(response.json().await?)
    }
}

/// Hex SHA-256 of the sorted `key=value` pairs followed by the API secret
fn sign(params: &BTreeMap<&'static str, String>, api_secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(string_to_sign(params).as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn string_to_sign(params: &BTreeMap<&'static str, String>) -> String {
    params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}

#[async_trait]
impl ArtifactStore for CloudinaryStore {
    async fn upload(
        &self,
        local_path: &Path,
        public_id: &str,
        resource_kind: &str,
    ) -> Result<StoredArtifact, StoreError> {
        let mut file = tokio::fs::File::open(local_path).await?;
        let total = file.metadata().await?.len();
        let file_name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let mut params = BTreeMap::new();
        params.insert("public_id", public_id.to_string());
        let params = self.signed_params(params);
        let url = self.endpoint(resource_kind, "upload");

        let chunk_size = self.config.chunk_size.max(1);
        let upload_id = uuid::Uuid::new_v4().to_string();
        let mut offset = 0u64;

        // Small files go in one request; large ones as ranged chunks that
        // share an upload id. The final chunk's response describes the asset.
        let response: UploadResponse = loop {
            let len = chunk_size.min(total - offset);
            let mut chunk = vec![0u8; len as usize];
            file.seek(std::io::SeekFrom::Start(offset)).await?;
            file.read_exact(&mut chunk).await?;

            let mut request = self
                .http
                .post(&url)
                .multipart(Self::form(&params, chunk, &file_name));
            if total > chunk_size {
                let end = offset + len - 1;
                debug!("Uploading bytes {}-{}/{} of {}", offset, end, total, public_id);
                request = request
                    .header("X-Unique-Upload-Id", upload_id.as_str())
                    .header("Content-Range", format!("bytes {}-{}/{}", offset, end, total));
            }

            let response = request.send().await?;
            offset += len;
            if offset >= total {
                break Self::read_response(response).await?;
            }
            Self::read_response::<serde_json::Value>(response).await?;
        };

        info!("Cloudinary stored {} ({} bytes)", response.public_id, response.bytes);

        Ok(StoredArtifact {
            url: response.secure_url.unwrap_or(response.url),
            store_id: response.public_id,
            resource_kind: response.resource_type,
            size_bytes: if response.bytes > 0 { response.bytes } else { total },
        })
    }

    async fn destroy(
        &self,
        store_id: &str,
        resource_kind: &str,
    ) -> Result<DestroyOutcome, StoreError> {
        let mut params = BTreeMap::new();
        params.insert("public_id", store_id.to_string());
        let params = self.signed_params(params);

        let response = self
            .http
            .post(self.endpoint(resource_kind, "destroy"))
            .form(&params)
            .send()
            .await?;
        let body: DestroyResponse = Self::read_response(response).await?;

        match body.result.as_str() {
            "ok" => Ok(DestroyOutcome::Destroyed),
            "not found" => Ok(DestroyOutcome::NotFound),
            other => Err(StoreError::Rejected(format!("destroy returned '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_to_sign_is_sorted_and_skips_empty_values() {
        let mut params = BTreeMap::new();
        params.insert("timestamp", "1315060510".to_string());
        params.insert("public_id", "sample".to_string());
        params.insert("eager", String::new());

        assert_eq!(string_to_sign(&params), "public_id=sample&timestamp=1315060510");
    }

    #[test]
    fn signature_is_hex_sha256_and_depends_on_secret() {
        let mut params = BTreeMap::new();
        params.insert("public_id", "sample".to_string());

        let a = sign(&params, "secret-a");
        let b = sign(&params, "secret-b");
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
        assert_eq!(a, sign(&params, "secret-a"));
    }
}
