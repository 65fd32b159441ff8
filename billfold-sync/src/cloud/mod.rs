//! Remote storage backends for sync.
//!
//! Provides path-keyed object storage over pluggable backends:
//! the hosted Billfold Cloud API and a mounted iCloud Drive folder.

pub mod api;
pub mod icloud;
pub mod storage;

pub use api::{ApiConfig, ApiStorage};
pub use icloud::{ICloudConfig, ICloudStorage};
pub use storage::{RemoteFileInfo, StorageConfig, StorageProvider};
