//! Storage provider abstraction trait.
//!
//! Defines a common interface for remote object stores keyed by path.

use crate::error::SyncResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Configuration shared by all storage providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// The folder within the remote store that holds sync files.
    pub sync_folder: String,
    /// Maximum size of a single synced file (in bytes).
    pub max_file_size: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sync_folder: "Billfold/sync".to_string(),
            max_file_size: 50 * 1024 * 1024, // 50 MB
        }
    }
}

/// Metadata about a file in the remote store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteFileInfo {
    /// The file's path relative to the sync folder,
    /// e.g. `Invoice/0192f7a2-….json`.
    pub path: String,
    /// The file name without the directory part.
    pub name: String,
    /// File size in bytes.
    pub size: u64,
    /// Last modified time as reported by the remote store.
    pub modified_at: DateTime<Utc>,
    /// Content hash (if the backend provides one).
    pub content_hash: Option<String>,
}

/// Abstract remote storage interface.
///
/// Remote paths are relative to the provider's sync folder and use
/// `/` separators; the engine constructs them as
/// `{entity_type}/{entity_id}.json`.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Returns the name of the storage provider.
    fn provider_name(&self) -> &'static str;

    /// Returns whether the provider is authenticated and ready.
    fn is_authenticated(&self) -> bool;

    /// Authenticates with the remote store.
    /// Returns an authentication URL if user interaction is needed.
    async fn authenticate(&self) -> SyncResult<Option<String>>;

    /// Discards any credentials or session state.
    async fn sign_out(&self) -> SyncResult<()>;

    /// Uploads a file, overwriting any existing copy at `path`.
    async fn upload_data(&self, data: &[u8], path: &str) -> SyncResult<RemoteFileInfo>;

    /// Downloads a file's content.
    async fn download_data(&self, path: &str) -> SyncResult<Vec<u8>>;

    /// Deletes a file. Deleting a missing file is not an error.
    async fn delete_data(&self, path: &str) -> SyncResult<()>;

    /// Lists the files directly under `directory`.
    async fn list_files(&self, directory: &str) -> SyncResult<Vec<RemoteFileInfo>>;

    /// Returns whether a file exists at `path`.
    async fn file_exists(&self, path: &str) -> SyncResult<bool>;

    /// Returns metadata for the file at `path`, or `None` if absent.
    async fn get_file_info(&self, path: &str) -> SyncResult<Option<RemoteFileInfo>>;
}
