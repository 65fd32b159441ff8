//! Billfold Cloud storage implementation.
//!
//! Talks to the hosted Billfold file API over HTTPS. Objects are
//! addressed by their sync path (`{entity_type}/{entity_id}.json`)
//! and writes are whole-file overwrites.

use super::storage::{RemoteFileInfo, StorageConfig, StorageProvider};
use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, info};

/// Billfold Cloud specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the file API (e.g. `https://api.billfold.app`).
    pub api_base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Base storage config.
    #[serde(flatten)]
    pub base: StorageConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.billfold.app".to_string(),
            timeout_secs: 30,
            base: StorageConfig::default(),
        }
    }
}

/// File metadata as returned by the API.
#[derive(Debug, Deserialize)]
struct ApiFileMeta {
    path: String,
    name: String,
    size: u64,
    modified_at: chrono::DateTime<chrono::Utc>,
    checksum: Option<String>,
}

impl From<ApiFileMeta> for RemoteFileInfo {
    fn from(meta: ApiFileMeta) -> Self {
        Self {
            path: meta.path,
            name: meta.name,
            size: meta.size,
            modified_at: meta.modified_at,
            content_hash: meta.checksum,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiFileList {
    files: Vec<ApiFileMeta>,
}

/// Billfold Cloud storage implementation.
pub struct ApiStorage {
    config: ApiConfig,
    client: Client,
    /// Bearer token issued by the (out-of-scope) session layer.
    access_token: RwLock<Option<String>>,
}

impl ApiStorage {
    /// Creates a new Billfold Cloud storage instance.
    pub fn new(config: ApiConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to create HTTP client");

        Self {
            config,
            client,
            access_token: RwLock::new(None),
        }
    }

    /// Sets an existing access token (e.g. restored from the keychain).
    pub fn set_access_token(&self, token: impl Into<String>) {
        *self.access_token.write().expect("token lock poisoned") = Some(token.into());
    }

    fn token(&self) -> SyncResult<String> {
        self.access_token
            .read()
            .expect("token lock poisoned")
            .clone()
            .ok_or(SyncError::ProviderNotAuthenticated)
    }

    /// Builds the object URL for a sync path, percent-encoding each
    /// segment but keeping `/` separators.
    fn file_url(&self, path: &str) -> String {
        let encoded: Vec<_> = path
            .split('/')
            .map(|seg| urlencoding::encode(seg).into_owned())
            .collect();
        format!("{}/v1/files/{}", self.config.api_base_url, encoded.join("/"))
    }

    fn request_error(err: reqwest::Error, what: &str) -> SyncError {
        if err.is_timeout() || err.is_connect() {
            SyncError::NetworkUnavailable
        } else {
            SyncError::Unknown(format!("{what}: {err}"))
        }
    }

    /// Maps the well-known HTTP status codes onto the sync error
    /// taxonomy; other failures fall back to the caller's mapping.
    fn status_error(status: StatusCode, path: &str) -> Option<SyncError> {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Some(SyncError::Unauthorized),
            StatusCode::NOT_FOUND => Some(SyncError::FileNotFound(path.to_string())),
            StatusCode::PAYLOAD_TOO_LARGE | StatusCode::INSUFFICIENT_STORAGE => {
                Some(SyncError::QuotaExceeded)
            }
            _ => None,
        }
    }
}

#[async_trait]
impl StorageProvider for ApiStorage {
    fn provider_name(&self) -> &'static str {
        "Billfold Cloud"
    }

    fn is_authenticated(&self) -> bool {
        self.access_token
            .read()
            .expect("token lock poisoned")
            .is_some()
    }

    async fn authenticate(&self) -> SyncResult<Option<String>> {
        let Ok(token) = self.token() else {
            // The session layer signs the user in through this URL and
            // hands the resulting token to `set_access_token`.
            return Ok(Some(format!("{}/link", self.config.api_base_url)));
        };

        let response = self
            .client
            .get(format!("{}/v1/me", self.config.api_base_url))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| Self::request_error(e, "auth check failed"))?;

        match response.status() {
            s if s.is_success() => {
                info!("Billfold Cloud authentication verified");
                Ok(None)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SyncError::Unauthorized),
            s => Err(SyncError::Unknown(format!("auth check failed: {s}"))),
        }
    }

    async fn sign_out(&self) -> SyncResult<()> {
        *self.access_token.write().expect("token lock poisoned") = None;
        info!("Signed out of Billfold Cloud");
        Ok(())
    }

    async fn upload_data(&self, data: &[u8], path: &str) -> SyncResult<RemoteFileInfo> {
        if data.len() as u64 > self.config.base.max_file_size {
            return Err(SyncError::InvalidData(format!(
                "payload of {} bytes exceeds the {} byte limit",
                data.len(),
                self.config.base.max_file_size
            )));
        }

        let token = self.token()?;
        debug!("Uploading {path} ({} bytes)", data.len());

        let response = self
            .client
            .put(self.file_url(path))
            .bearer_auth(&token)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| Self::request_error(e, "upload failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status, path)
                .unwrap_or_else(|| SyncError::UploadFailed(format!("{status}: {body}"))));
        }

        let meta: ApiFileMeta = response
            .json()
            .await
            .map_err(|e| SyncError::UploadFailed(format!("failed to parse upload response: {e}")))?;

        info!("Uploaded file to Billfold Cloud: {path}");
        Ok(meta.into())
    }

    async fn download_data(&self, path: &str) -> SyncResult<Vec<u8>> {
        let token = self.token()?;
        debug!("Downloading {path}");

        let response = self
            .client
            .get(self.file_url(path))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| Self::request_error(e, "download failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status, path)
                .unwrap_or_else(|| SyncError::DownloadFailed(format!("{status}: {body}"))));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SyncError::DownloadFailed(format!("failed to read body: {e}")))?;

        Ok(bytes.to_vec())
    }

    async fn delete_data(&self, path: &str) -> SyncResult<()> {
        let token = self.token()?;

        let response = self
            .client
            .delete(self.file_url(path))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| Self::request_error(e, "delete failed"))?;

        let status = response.status();
        // A missing file is fine for delete
        if status.is_success() || status == StatusCode::NOT_FOUND {
            info!("Deleted file from Billfold Cloud: {path}");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(Self::status_error(status, path)
            .unwrap_or_else(|| SyncError::Unknown(format!("delete failed: {status}: {body}"))))
    }

    async fn list_files(&self, directory: &str) -> SyncResult<Vec<RemoteFileInfo>> {
        let token = self.token()?;

        let response = self
            .client
            .get(format!("{}/v1/files", self.config.api_base_url))
            .bearer_auth(&token)
            .query(&[("prefix", directory)])
            .send()
            .await
            .map_err(|e| Self::request_error(e, "list failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status, directory)
                .unwrap_or_else(|| SyncError::Unknown(format!("list failed: {status}: {body}"))));
        }

        let list: ApiFileList = response
            .json()
            .await
            .map_err(|e| SyncError::InvalidData(format!("failed to parse file list: {e}")))?;

        Ok(list.files.into_iter().map(Into::into).collect())
    }

    async fn file_exists(&self, path: &str) -> SyncResult<bool> {
        Ok(self.get_file_info(path).await?.is_some())
    }

    async fn get_file_info(&self, path: &str) -> SyncResult<Option<RemoteFileInfo>> {
        let token = self.token()?;

        let response = self
            .client
            .get(format!("{}/meta", self.file_url(path)))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| Self::request_error(e, "metadata fetch failed"))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status, path)
                .unwrap_or_else(|| SyncError::Unknown(format!("metadata fetch failed: {status}: {body}"))));
        }

        let meta: ApiFileMeta = response
            .json()
            .await
            .map_err(|e| SyncError::InvalidData(format!("failed to parse metadata: {e}")))?;

        Ok(Some(meta.into()))
    }
}
