//! Offline-first sync engine for Billfold.
//!
//! Reconciles locally mutated business records (invoices, clients,
//! business profile, templates) with a remote store under unreliable
//! connectivity: durable, ordered, at-most-one-in-flight delivery of
//! mutations, bounded retries, and explicit conflict escalation.
//!
//! # Architecture
//!
//! - **Queue**: deduplicated, priority-ordered, persisted pending
//!   mutations (one item per record)
//! - **Engine**: drives one sync pass at a time over the queue,
//!   applying the retry/drop policy
//! - **Conflict**: detected divergences and their resolution
//! - **Cloud**: the storage provider abstraction and its backends
//! - **Reachability**: the connectivity signal that triggers passes
//!
//! # Sync pass
//!
//! 1. A local mutation is enqueued (superseding any pending item for
//!    the same record) and the queue is persisted
//! 2. If online and idle, a pass starts; items are processed in
//!    priority order
//! 3. Each item maps to an upload or delete against the provider;
//!    failures retry up to a bound, then the item is dropped
//! 4. A remote copy newer than the queued snapshot becomes a
//!    conflict and waits for an explicit resolution
//!
//! # Example
//!
//! ```
//! use billfold_sync::{SyncConfig, SyncQueue, SyncQueueItem};
//! use billfold_types::{RecordId, SyncOperation, SyncPriority};
//!
//! let mut queue = SyncQueue::new();
//! let invoice = RecordId::new();
//! queue.insert(SyncQueueItem::new(
//!     SyncOperation::Create,
//!     "Invoice",
//!     invoice,
//!     b"{}".to_vec(),
//!     SyncPriority::High,
//! ));
//!
//! assert_eq!(queue.len(), 1);
//! assert_eq!(
//!     queue.items()[0].remote_path(),
//!     format!("Invoice/{invoice}.json")
//! );
//!
//! let config = SyncConfig::default();
//! assert_eq!(config.max_retry_count, 3);
//! ```

pub mod cloud;
mod conflict;
mod engine;
mod error;
mod queue;
mod reachability;
mod status;

pub use cloud::{
    ApiConfig, ApiStorage, ICloudConfig, ICloudStorage, RemoteFileInfo, StorageConfig,
    StorageProvider,
};
pub use conflict::{ConflictOutcome, ConflictResolution, ConflictResolver, SyncConflictItem};
pub use engine::{SyncConfig, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use queue::{QueueStore, SyncQueue, SyncQueueItem};
pub use reachability::{ConnectivityState, NetworkMonitor};
pub use status::{SyncSnapshot, SyncStatus};
