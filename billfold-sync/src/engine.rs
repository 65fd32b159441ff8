//! Sync engine — drives one synchronization pass at a time.
//!
//! The engine owns the queue, maps each queued mutation onto storage
//! provider calls, applies the retry/drop policy, and publishes a
//! coarse status snapshot for observers. Exactly one pass may run at
//! any time; the guard is checked at the start of [`SyncEngine::sync_data`].

use chrono::Utc;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use billfold_types::{RecordId, SyncOperation, SyncPriority};

use crate::cloud::StorageProvider;
use crate::conflict::{ConflictOutcome, ConflictResolution, ConflictResolver, SyncConflictItem};
use crate::error::{SyncError, SyncResult};
use crate::queue::{QueueStore, SyncQueue, SyncQueueItem};
use crate::reachability::NetworkMonitor;
use crate::status::{SyncSnapshot, SyncStatus};

/// Configuration for the sync engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Failed delivery attempts allowed per item before it is dropped.
    pub max_retry_count: u32,
    /// Timeout for a single provider call (ms).
    pub timeout_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_retry_count: 3,
            timeout_ms: 30_000,
        }
    }
}

/// What a single delivery attempt produced.
enum Delivery {
    /// The mutation reached the remote store.
    Completed,
    /// The remote copy changed independently; escalate.
    Diverged(SyncConflictItem),
}

/// Resets the in-flight flag when a pass ends, however it ends.
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct EngineShared {
    config: SyncConfig,
    store: QueueStore,
    monitor: Arc<dyn NetworkMonitor>,
    provider: RwLock<Option<Arc<dyn StorageProvider>>>,
    queue: Mutex<SyncQueue>,
    conflicts: Mutex<Vec<SyncConflictItem>>,
    syncing: AtomicBool,
    snapshot: watch::Sender<SyncSnapshot>,
}

/// The sync engine. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct SyncEngine {
    shared: Arc<EngineShared>,
}

impl SyncEngine {
    /// Creates an engine, restoring any persisted queue from `store`.
    ///
    /// The storage provider is attached separately via
    /// [`SyncEngine::set_provider`]; call [`SyncEngine::start`] to
    /// react to connectivity changes.
    pub async fn new(
        config: SyncConfig,
        store: QueueStore,
        monitor: Arc<dyn NetworkMonitor>,
    ) -> Self {
        let queue = store.load().await;
        let initial = SyncSnapshot {
            is_online: monitor.is_online(),
            pending_count: queue.len(),
            ..SyncSnapshot::default()
        };
        let (snapshot, _) = watch::channel(initial);

        Self {
            shared: Arc::new(EngineShared {
                config,
                store,
                monitor,
                provider: RwLock::new(None),
                queue: Mutex::new(queue),
                conflicts: Mutex::new(Vec::new()),
                syncing: AtomicBool::new(false),
                snapshot,
            }),
        }
    }

    /// Attaches (or replaces) the storage provider. Rejected while a
    /// pass is running; a provider must not be swapped mid-pass.
    pub async fn set_provider(&self, provider: Arc<dyn StorageProvider>) -> SyncResult<()> {
        if self.shared.syncing.load(Ordering::SeqCst) {
            return Err(SyncError::SyncInProgress);
        }
        info!("storage provider set to {}", provider.provider_name());
        *self.shared.provider.write().await = Some(provider);
        Ok(())
    }

    /// A receiver of engine state snapshots.
    pub fn subscribe(&self) -> watch::Receiver<SyncSnapshot> {
        self.shared.snapshot.subscribe()
    }

    /// The current engine state.
    pub fn snapshot(&self) -> SyncSnapshot {
        self.shared.snapshot.borrow().clone()
    }

    /// Current connectivity as reported by the network monitor.
    pub fn is_online(&self) -> bool {
        self.shared.monitor.is_online()
    }

    /// Number of pending queue items.
    pub async fn queue_len(&self) -> usize {
        self.shared.queue.lock().await.len()
    }

    /// The divergences awaiting resolution.
    pub async fn conflicts(&self) -> Vec<SyncConflictItem> {
        self.shared.conflicts.lock().await.clone()
    }

    /// Queues a mutation for delivery, superseding any pending item
    /// for the same record, and persists the queue. If the system is
    /// online and no pass is running, a pass is triggered in the
    /// background; its outcome is only visible through the snapshot.
    pub async fn enqueue(
        &self,
        operation: SyncOperation,
        entity_type: impl Into<String>,
        entity_id: RecordId,
        payload: Vec<u8>,
        priority: SyncPriority,
    ) -> SyncResult<()> {
        let item = SyncQueueItem::new(operation, entity_type, entity_id, payload, priority);
        debug!(
            "queueing {} for {}/{} at {} priority",
            item.operation, item.entity_type, item.entity_id, item.priority
        );

        let pending = {
            let mut queue = self.shared.queue.lock().await;
            queue.insert(item);
            self.shared.store.save(&queue).await?;
            queue.len()
        };
        self.publish(|s| s.pending_count = pending);

        if self.is_online() && !self.shared.syncing.load(Ordering::SeqCst) {
            let engine = self.clone();
            tokio::spawn(async move {
                if let Err(e) = engine.sync_data().await {
                    debug!("enqueue-triggered pass not run: {e}");
                }
            });
        }

        Ok(())
    }

    /// Empties the queue and persists the empty state. Used for
    /// explicit user-initiated resets.
    pub async fn clear_queue(&self) -> SyncResult<()> {
        let mut queue = self.shared.queue.lock().await;
        queue.clear();
        self.shared.store.save(&queue).await?;
        drop(queue);

        self.publish(|s| s.pending_count = 0);
        info!("sync queue cleared");
        Ok(())
    }

    /// Clears the last error and starts a pass.
    pub async fn retry_sync(&self) -> SyncResult<()> {
        self.publish(|s| s.error = None);
        self.sync_data().await
    }

    /// Runs one synchronization pass over the current queue snapshot.
    ///
    /// Fails immediately with [`SyncError::SyncInProgress`] if a pass
    /// is already running, [`SyncError::NoProvider`] without a
    /// provider, and [`SyncError::ProviderNotAuthenticated`] if the
    /// provider is not ready. Offline is not an error: the call
    /// returns and items stay queued for the next trigger.
    pub async fn sync_data(&self) -> SyncResult<()> {
        let shared = &self.shared;
        if shared
            .syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SyncError::SyncInProgress);
        }
        let _guard = PassGuard(&shared.syncing);

        let provider = shared
            .provider
            .read()
            .await
            .clone()
            .ok_or(SyncError::NoProvider)?;
        if !provider.is_authenticated() {
            return Err(SyncError::ProviderNotAuthenticated);
        }
        if !self.is_online() {
            debug!("offline, leaving {} items queued", self.queue_len().await);
            return Ok(());
        }

        let items = shared.queue.lock().await.items().to_vec();
        let total = items.len();
        self.publish(|s| {
            s.status = SyncStatus::Syncing;
            s.progress = 0.0;
            s.error = None;
        });
        info!("starting sync pass over {total} items");

        let mut processed = 0usize;
        let mut dropped = 0usize;
        let mut diverged = 0usize;
        let mut pass_error: Option<SyncError> = None;

        'items: for mut item in items {
            loop {
                self.publish(|s| {
                    s.status = match item.operation {
                        SyncOperation::Delete => SyncStatus::Syncing,
                        _ => SyncStatus::Uploading,
                    };
                });

                match self.deliver(provider.as_ref(), &item).await {
                    Ok(Delivery::Completed) => {
                        shared.queue.lock().await.remove(item.id);
                        debug!(
                            "delivered {} for {}/{}",
                            item.operation, item.entity_type, item.entity_id
                        );
                        break;
                    }
                    Ok(Delivery::Diverged(conflict)) => {
                        shared.queue.lock().await.remove(item.id);
                        warn!(
                            "remote copy of {} changed independently, awaiting resolution",
                            conflict.path
                        );
                        shared.conflicts.lock().await.push(conflict);
                        diverged += 1;
                        break;
                    }
                    Err(e) if is_pass_fatal(&e) => {
                        pass_error = Some(e);
                        break 'items;
                    }
                    Err(e) if item.retry_count >= shared.config.max_retry_count => {
                        shared.queue.lock().await.remove(item.id);
                        dropped += 1;
                        warn!(
                            "dropping {} for {}/{} after {} failed attempts: {e}",
                            item.operation,
                            item.entity_type,
                            item.entity_id,
                            item.retry_count + 1
                        );
                        break;
                    }
                    Err(e) => {
                        item.retry_count += 1;
                        shared.queue.lock().await.increment_retry(item.id);
                        debug!(
                            "delivery of {}/{} failed (retry {}): {e}",
                            item.entity_type, item.entity_id, item.retry_count
                        );
                    }
                }
            }

            processed += 1;
            let progress = processed as f64 / total as f64;
            self.publish(|s| s.progress = progress);
        }

        let queue = shared.queue.lock().await;
        let pending = queue.len();
        if let Err(e) = shared.store.save(&queue).await {
            warn!("failed to persist queue after pass: {e}");
            if pass_error.is_none() {
                pass_error = Some(e);
            }
        }
        drop(queue);
        let conflicts = shared.conflicts.lock().await.clone();

        match pass_error {
            Some(e) => {
                let message = e.to_string();
                self.publish(|s| {
                    s.status = SyncStatus::Error;
                    s.error = Some(message.clone());
                    s.pending_count = pending;
                    s.conflicts = conflicts;
                });
                warn!("sync pass aborted: {e}");
                Err(e)
            }
            None => {
                let now = Utc::now();
                let has_conflicts = !conflicts.is_empty();
                self.publish(|s| {
                    s.status = if has_conflicts {
                        SyncStatus::Conflict
                    } else {
                        SyncStatus::Idle
                    };
                    s.last_sync = Some(now);
                    s.error = None;
                    s.progress = 1.0;
                    s.pending_count = pending;
                    s.conflicts = conflicts;
                });
                info!(
                    "sync pass complete: {processed} processed, {dropped} dropped, {diverged} conflicts"
                );
                Ok(())
            }
        }
    }

    /// Applies `resolution` to the pending conflict `conflict_id`.
    /// The conflict leaves the pending set only if resolution
    /// succeeds; failures keep it for a later retry.
    pub async fn resolve_conflict(
        &self,
        conflict_id: Uuid,
        resolution: ConflictResolution,
    ) -> SyncResult<ConflictOutcome> {
        let provider = self
            .shared
            .provider
            .read()
            .await
            .clone()
            .ok_or(SyncError::NoProvider)?;

        let conflict = self
            .shared
            .conflicts
            .lock()
            .await
            .iter()
            .find(|c| c.id == conflict_id)
            .cloned()
            .ok_or_else(|| SyncError::Unknown(format!("no pending conflict {conflict_id}")))?;

        let prior = self.snapshot().status;
        self.publish(|s| {
            s.status = match resolution {
                ConflictResolution::UseRemote => SyncStatus::Downloading,
                _ => SyncStatus::Uploading,
            };
        });

        let resolver = ConflictResolver::new(provider.as_ref());
        match resolver.resolve(&conflict, resolution).await {
            Ok(outcome) => {
                let remaining = {
                    let mut conflicts = self.shared.conflicts.lock().await;
                    conflicts.retain(|c| c.id != conflict_id);
                    conflicts.clone()
                };
                let resolved_all = remaining.is_empty();
                self.publish(|s| {
                    s.conflicts = remaining;
                    s.status = if resolved_all {
                        SyncStatus::Idle
                    } else {
                        SyncStatus::Conflict
                    };
                });
                Ok(outcome)
            }
            Err(e) => {
                self.publish(|s| s.status = prior);
                warn!("conflict resolution for {} failed: {e}", conflict.path);
                Err(e)
            }
        }
    }

    /// Spawns the connectivity watcher: any offline → online
    /// transition with a non-empty queue and no running pass triggers
    /// a sync. Errors from those passes never propagate; they are
    /// visible only through the snapshot.
    pub fn start(&self) -> JoinHandle<()> {
        let engine = self.clone();
        // Subscribe before spawning so no transition can slip past.
        let mut rx = self.shared.monitor.subscribe();
        tokio::spawn(async move {
            let mut was_online = *rx.borrow_and_update();
            engine.publish(|s| s.is_online = was_online);

            while rx.changed().await.is_ok() {
                let online = *rx.borrow_and_update();
                engine.publish(|s| s.is_online = online);

                if online && !was_online {
                    let queue_empty = engine.shared.queue.lock().await.is_empty();
                    let idle = !engine.shared.syncing.load(Ordering::SeqCst);
                    if !queue_empty && idle {
                        info!("connectivity restored, triggering sync pass");
                        if let Err(e) = engine.sync_data().await {
                            debug!("reconnect-triggered pass not run: {e}");
                        }
                    }
                }
                was_online = online;
            }
        })
    }

    /// One delivery attempt for one item. Checks the remote copy's
    /// modification time first: a copy newer than the queued snapshot
    /// diverged independently and is escalated instead of overwritten.
    async fn deliver(
        &self,
        provider: &dyn StorageProvider,
        item: &SyncQueueItem,
    ) -> SyncResult<Delivery> {
        let path = item.remote_path();
        let limit = Duration::from_millis(self.shared.config.timeout_ms);

        if let Some(remote) = with_timeout(limit, provider.get_file_info(&path)).await? {
            if remote.modified_at > item.created_at {
                self.publish(|s| s.status = SyncStatus::Downloading);
                let remote_payload = with_timeout(limit, provider.download_data(&path)).await?;
                return Ok(Delivery::Diverged(SyncConflictItem {
                    id: Uuid::new_v4(),
                    path,
                    entity_type: item.entity_type.clone(),
                    entity_id: item.entity_id,
                    local_payload: item.payload.clone(),
                    remote_payload,
                    local_modified: item.created_at,
                    remote_modified: remote.modified_at,
                }));
            }
        }

        match item.operation {
            SyncOperation::Create | SyncOperation::Update => {
                with_timeout(limit, provider.upload_data(&item.payload, &path)).await?;
            }
            SyncOperation::Delete => {
                with_timeout(limit, provider.delete_data(&path)).await?;
            }
        }

        Ok(Delivery::Completed)
    }

    fn publish(&self, update: impl FnOnce(&mut SyncSnapshot)) {
        self.shared.snapshot.send_modify(update);
    }
}

/// Pass-fatal errors abort the whole pass instead of consuming the
/// item's retry budget.
fn is_pass_fatal(err: &SyncError) -> bool {
    matches!(
        err,
        SyncError::Unauthorized | SyncError::ProviderNotAuthenticated | SyncError::NoProvider
    )
}

/// Bounds a provider call; an elapsed timeout is a network failure
/// and takes the per-item retry path.
async fn with_timeout<T>(
    limit: Duration,
    call: impl Future<Output = SyncResult<T>>,
) -> SyncResult<T> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| SyncError::NetworkUnavailable)?
}
