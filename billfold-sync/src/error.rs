//! Error types for the sync layer.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No storage provider has been configured on the engine.
    #[error("no storage provider configured")]
    NoProvider,

    /// The configured provider reports that it is not authenticated.
    #[error("storage provider is not authenticated")]
    ProviderNotAuthenticated,

    /// The network is unreachable or the request timed out.
    #[error("network unavailable")]
    NetworkUnavailable,

    /// A remote file was not found.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// An upload could not be completed.
    #[error("upload failed: {0}")]
    UploadFailed(String),

    /// A download could not be completed.
    #[error("download failed: {0}")]
    DownloadFailed(String),

    /// The remote copy diverged from the queued local mutation.
    #[error("conflict detected for {0}")]
    ConflictDetected(String),

    /// The remote store refused the write for lack of space.
    #[error("storage quota exceeded")]
    QuotaExceeded,

    /// The provider rejected our credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// A payload could not be serialized or was rejected as malformed.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A sync pass is already running; only one may be active at a time.
    #[error("a sync pass is already in progress")]
    SyncInProgress,

    /// Local durable storage (queue persistence) failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Anything that does not fit the taxonomy above.
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidData(err.to_string())
    }
}
