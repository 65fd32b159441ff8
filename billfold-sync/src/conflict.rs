//! Conflict representation and resolution.
//!
//! A conflict is a detected divergence between a queued local
//! mutation and independently-changed remote state for the same
//! record. Conflicts are never retried or dropped automatically;
//! they wait for an explicit resolution.

use billfold_types::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::cloud::StorageProvider;
use crate::error::SyncResult;

/// A detected divergence, self-contained: both payloads are captured
/// at detection time so resolution needs no further queue state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConflictItem {
    /// Unique identifier of this conflict.
    pub id: Uuid,
    /// Remote path of the contested file.
    pub path: String,
    /// Logical record kind tag.
    pub entity_type: String,
    /// Identifier of the contested record.
    pub entity_id: RecordId,
    /// The queued local snapshot.
    pub local_payload: Vec<u8>,
    /// The remote copy at detection time.
    pub remote_payload: Vec<u8>,
    /// When the local mutation was captured.
    pub local_modified: DateTime<Utc>,
    /// When the remote copy was last modified.
    pub remote_modified: DateTime<Utc>,
}

/// The caller-chosen way out of a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictResolution {
    /// Overwrite the remote copy with the local payload.
    UseLocal,
    /// Adopt the remote copy; the persistence layer applies it locally.
    UseRemote,
    /// Entity-specific merge. No record kind defines one yet, so this
    /// currently behaves as `UseLocal`.
    Merge,
}

/// What a successful resolution produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ConflictOutcome {
    /// The local payload now owns the remote path.
    LocalKept,
    /// The remote payload won; the caller must apply these bytes to
    /// the local store.
    RemoteAdopted(Vec<u8>),
}

/// Applies resolutions against a storage provider.
pub struct ConflictResolver<'a> {
    provider: &'a dyn StorageProvider,
}

impl<'a> ConflictResolver<'a> {
    /// Creates a resolver over the given provider.
    pub fn new(provider: &'a dyn StorageProvider) -> Self {
        Self { provider }
    }

    /// Applies `resolution` to `conflict`. On failure the conflict
    /// must remain pending; the caller only removes it on `Ok`.
    pub async fn resolve(
        &self,
        conflict: &SyncConflictItem,
        resolution: ConflictResolution,
    ) -> SyncResult<ConflictOutcome> {
        match resolution {
            ConflictResolution::UseLocal => self.overwrite_remote(conflict).await,
            ConflictResolution::Merge => {
                warn!(
                    "no merge strategy for {}, keeping the local copy",
                    conflict.entity_type
                );
                self.overwrite_remote(conflict).await
            }
            ConflictResolution::UseRemote => {
                let bytes = self.provider.download_data(&conflict.path).await?;
                info!(
                    "resolved conflict on {} by adopting the remote copy",
                    conflict.path
                );
                Ok(ConflictOutcome::RemoteAdopted(bytes))
            }
        }
    }

    async fn overwrite_remote(&self, conflict: &SyncConflictItem) -> SyncResult<ConflictOutcome> {
        self.provider
            .upload_data(&conflict.local_payload, &conflict.path)
            .await?;
        info!(
            "resolved conflict on {} by overwriting the remote copy",
            conflict.path
        );
        Ok(ConflictOutcome::LocalKept)
    }
}
