//! iCloud Drive storage implementation.
//!
//! Uses file system access to the iCloud Drive container folder.
//! This works on macOS/iOS where iCloud Drive is mounted as a folder.

use super::storage::{RemoteFileInfo, StorageConfig, StorageProvider};
use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// iCloud specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ICloudConfig {
    /// The iCloud Drive container path.
    /// On macOS: ~/Library/Mobile Documents/iCloud~com~billfold~app/
    /// Can be overridden for testing or custom setups.
    pub container_path: Option<PathBuf>,
    /// App bundle identifier for the iCloud container.
    pub bundle_id: String,
    /// Base storage config.
    #[serde(flatten)]
    pub base: StorageConfig,
}

impl Default for ICloudConfig {
    fn default() -> Self {
        Self {
            container_path: None,
            bundle_id: "com.billfold.app".to_string(),
            base: StorageConfig::default(),
        }
    }
}

/// iCloud Drive storage implementation.
///
/// Remote paths like `Invoice/<id>.json` map to nested directories
/// under the sync folder.
pub struct ICloudStorage {
    config: ICloudConfig,
}

impl ICloudStorage {
    /// Creates a new iCloud storage instance.
    pub fn new(config: ICloudConfig) -> Self {
        Self { config }
    }

    /// Gets the iCloud Drive container path.
    fn container_path(&self) -> SyncResult<PathBuf> {
        if let Some(path) = &self.config.container_path {
            return Ok(path.clone());
        }

        // Standard macOS iCloud Drive path
        let home = std::env::var("HOME")
            .map_err(|_| SyncError::Storage("HOME environment variable not set".to_string()))?;

        // iCloud container format: ~/Library/Mobile Documents/iCloud~<bundle_id>/
        let container_name = format!("iCloud~{}", self.config.bundle_id.replace('.', "~"));
        let path = PathBuf::from(home)
            .join("Library")
            .join("Mobile Documents")
            .join(container_name);

        Ok(path)
    }

    /// Gets the sync folder path, creating it if necessary.
    async fn sync_folder(&self) -> SyncResult<PathBuf> {
        let container = self.container_path()?;
        let sync_folder = container.join(&self.config.base.sync_folder);

        if !sync_folder.exists() {
            fs::create_dir_all(&sync_folder)
                .await
                .map_err(|e| SyncError::Storage(format!("failed to create sync folder: {e}")))?;
            info!("Created iCloud sync folder: {:?}", sync_folder);
        }

        Ok(sync_folder)
    }

    /// Resolves a remote path (e.g. `Invoice/<id>.json`) to the file
    /// system path under the sync folder. Rejects path traversal.
    async fn resolve(&self, remote_path: &str) -> SyncResult<PathBuf> {
        if remote_path.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
            return Err(SyncError::InvalidData(format!(
                "invalid remote path: {remote_path}"
            )));
        }
        Ok(self.sync_folder().await?.join(remote_path))
    }

    /// Converts a file system path to RemoteFileInfo.
    async fn file_info(&self, fs_path: &Path, remote_path: &str) -> SyncResult<RemoteFileInfo> {
        let metadata = fs::metadata(fs_path)
            .await
            .map_err(|e| SyncError::Storage(format!("failed to get file metadata: {e}")))?;

        let name = fs_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let modified_at = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        Ok(RemoteFileInfo {
            path: remote_path.to_string(),
            name,
            size: metadata.len(),
            modified_at,
            content_hash: None,
        })
    }
}

#[async_trait]
impl StorageProvider for ICloudStorage {
    fn provider_name(&self) -> &'static str {
        "iCloud Drive"
    }

    fn is_authenticated(&self) -> bool {
        // iCloud is "authenticated" if the container folder exists
        self.container_path().map(|p| p.exists()).unwrap_or(false)
    }

    async fn authenticate(&self) -> SyncResult<Option<String>> {
        let container = self.container_path()?;

        if !container.exists() {
            // The container is created by the OS when iCloud Drive is enabled
            return Err(SyncError::Unauthorized);
        }

        self.sync_folder().await?;

        info!("iCloud Drive authenticated via container: {:?}", container);
        Ok(None) // No OAuth URL needed
    }

    async fn sign_out(&self) -> SyncResult<()> {
        // No-op for iCloud - auth is implicit via file system access
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

        let fs_path = self.resolve(path).await?;
        if let Some(parent) = fs_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::UploadFailed(format!("failed to create directory: {e}")))?;
        }

        debug!("Uploading to iCloud: {:?} ({} bytes)", fs_path, data.len());

        fs::write(&fs_path, data)
            .await
            .map_err(|e| SyncError::UploadFailed(format!("failed to write file: {e}")))?;

        let info = self.file_info(&fs_path, path).await?;
        info!("Uploaded file to iCloud: {path}");
        Ok(info)
    }

    async fn download_data(&self, path: &str) -> SyncResult<Vec<u8>> {
        let fs_path = self.resolve(path).await?;

        debug!("Downloading from iCloud: {:?}", fs_path);
        match fs::read(&fs_path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SyncError::FileNotFound(path.to_string()))
            }
            Err(e) => Err(SyncError::DownloadFailed(format!(
                "failed to read file: {e}"
            ))),
        }
    }

    async fn delete_data(&self, path: &str) -> SyncResult<()> {
        let fs_path = self.resolve(path).await?;

        match fs::remove_file(&fs_path).await {
            Ok(()) => {
                info!("Deleted file from iCloud: {path}");
                Ok(())
            }
            // File doesn't exist - that's fine for delete
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SyncError::Storage(format!("failed to delete file: {e}"))),
        }
    }

    async fn list_files(&self, directory: &str) -> SyncResult<Vec<RemoteFileInfo>> {
        let dir_path = if directory.is_empty() {
            self.sync_folder().await?
        } else {
            self.resolve(directory).await?
        };

        if !dir_path.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let mut read_dir = fs::read_dir(&dir_path)
            .await
            .map_err(|e| SyncError::Storage(format!("failed to read sync folder: {e}")))?;

        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| SyncError::Storage(format!("failed to read directory entry: {e}")))?
        {
            let fs_path = entry.path();

            // Skip directories and hidden files
            if fs_path.is_dir()
                || fs_path
                    .file_name()
                    .map(|n| n.to_string_lossy().starts_with('.'))
                    .unwrap_or(false)
            {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            let remote_path = if directory.is_empty() {
                name.clone()
            } else {
                format!("{directory}/{name}")
            };

            match self.file_info(&fs_path, &remote_path).await {
                Ok(file) => files.push(file),
                Err(e) => warn!("Skipping file due to error: {e}"),
            }
        }

        Ok(files)
    }

    async fn file_exists(&self, path: &str) -> SyncResult<bool> {
        let fs_path = self.resolve(path).await?;
        fs_path
            .try_exists()
            .map_err(|e| SyncError::Storage(format!("failed to check file: {e}")))
    }

    async fn get_file_info(&self, path: &str) -> SyncResult<Option<RemoteFileInfo>> {
        let fs_path = self.resolve(path).await?;
        if !fs_path.exists() {
            return Ok(None);
        }
        self.file_info(&fs_path, path).await.map(Some)
    }
}
