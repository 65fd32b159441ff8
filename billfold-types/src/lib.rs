//! Core type definitions for Billfold.
//!
//! This crate defines the fundamental, storage-agnostic types shared
//! by the sync engine and the persistence layer:
//! - Record identifiers (UUID v7)
//! - The sync vocabulary: operations and priorities
//!
//! Domain models (invoices, clients, business profile, templates) live
//! in the persistence layer, not here.

mod ids;
mod sync;

pub use ids::RecordId;
pub use sync::{SyncOperation, SyncPriority};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),
}
