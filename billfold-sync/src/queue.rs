//! The pending-mutation queue and its durable store.
//!
//! The queue holds at most one item per `(entity_type, entity_id)`
//! pair, ordered by priority (descending) then enqueue time
//! (ascending). Every mutation is rewritten in full to a single JSON
//! file so the queue survives process restarts.

use billfold_types::{RecordId, SyncOperation, SyncPriority};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};

/// A pending mutation awaiting delivery to the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncQueueItem {
    /// Unique identifier, assigned at creation.
    pub id: Uuid,
    /// The kind of mutation.
    pub operation: SyncOperation,
    /// Logical record kind tag, e.g. "Invoice".
    pub entity_type: String,
    /// Identifier of the affected record.
    pub entity_id: RecordId,
    /// Opaque serialized snapshot of the record at enqueue time.
    pub payload: Vec<u8>,
    /// Enqueue time; tie-break for ordering among equal priorities.
    pub created_at: DateTime<Utc>,
    /// Delivery priority; higher is served first.
    pub priority: SyncPriority,
    /// Number of failed delivery attempts so far.
    pub retry_count: u32,
}

impl SyncQueueItem {
    /// Creates a new queue item with a fresh id and the current time.
    pub fn new(
        operation: SyncOperation,
        entity_type: impl Into<String>,
        entity_id: RecordId,
        payload: Vec<u8>,
        priority: SyncPriority,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation,
            entity_type: entity_type.into(),
            entity_id,
            payload,
            created_at: Utc::now(),
            priority,
            retry_count: 0,
        }
    }

    /// The path this item's record lives at in the remote store.
    pub fn remote_path(&self) -> String {
        format!("{}/{}.json", self.entity_type, self.entity_id)
    }
}

/// The deduplicated, priority-ordered set of pending mutations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncQueue {
    items: Vec<SyncQueueItem>,
}

impl SyncQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The pending items in processing order.
    pub fn items(&self) -> &[SyncQueueItem] {
        &self.items
    }

    /// Inserts a pending mutation, superseding any existing item for
    /// the same `(entity_type, entity_id)` pair, and restores the
    /// ordering invariant.
    pub fn insert(&mut self, item: SyncQueueItem) {
        let before = self.items.len();
        self.items
            .retain(|i| !(i.entity_type == item.entity_type && i.entity_id == item.entity_id));
        if self.items.len() < before {
            debug!(
                "superseding queued mutation for {}/{}",
                item.entity_type, item.entity_id
            );
        }
        self.items.push(item);
        self.sort();
    }

    /// Removes a specific item after delivery (or drop). Returns the
    /// removed item, if it was still queued.
    pub fn remove(&mut self, id: Uuid) -> Option<SyncQueueItem> {
        let pos = self.items.iter().position(|i| i.id == id)?;
        Some(self.items.remove(pos))
    }

    /// Finds an item by id.
    pub fn get(&self, id: Uuid) -> Option<&SyncQueueItem> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Increments the retry counter of a queued item, returning the
    /// new count if the item is still queued.
    pub fn increment_retry(&mut self, id: Uuid) -> Option<u32> {
        let item = self.items.iter_mut().find(|i| i.id == id)?;
        item.retry_count += 1;
        Some(item.retry_count)
    }

    /// Empties the queue.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    fn sort(&mut self) {
        self.items
            .sort_by_key(|i| (Reverse(i.priority), i.created_at));
    }
}

/// Durable storage for the queue: one well-known JSON file, fully
/// rewritten on every mutation.
#[derive(Debug, Clone)]
pub struct QueueStore {
    path: PathBuf,
}

impl QueueStore {
    const FILE_NAME: &'static str = "sync_queue.json";

    /// Creates a store rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: data_dir.into().join(Self::FILE_NAME),
        }
    }

    /// The file the queue is persisted to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted queue. A missing file yields an empty
    /// queue; an unreadable or corrupt file is logged and likewise
    /// yields an empty queue rather than failing the process.
    pub async fn load(&self) -> SyncQueue {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return SyncQueue::new(),
            Err(e) => {
                warn!("failed to read persisted queue, starting empty: {e}");
                return SyncQueue::new();
            }
        };

        match serde_json::from_slice::<SyncQueue>(&bytes) {
            Ok(mut queue) => {
                queue.sort();
                debug!("restored {} pending items from {:?}", queue.len(), self.path);
                queue
            }
            Err(e) => {
                warn!("persisted queue is corrupt, starting empty: {e}");
                SyncQueue::new()
            }
        }
    }

    /// Persists the queue, replacing the previous file atomically
    /// (write to a temporary file, then rename over).
    pub async fn save(&self, queue: &SyncQueue) -> SyncResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::Storage(format!("failed to create data dir: {e}")))?;
        }

        let bytes = serde_json::to_vec(queue)?;
        let tmp = self.path.with_extension("json.tmp");

        fs::write(&tmp, &bytes)
            .await
            .map_err(|e| SyncError::Storage(format!("failed to write queue file: {e}")))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| SyncError::Storage(format!("failed to replace queue file: {e}")))?;

        Ok(())
    }
}
