#![allow(dead_code)]

use async_trait::async_trait;
use billfold_sync::{
    ConnectivityState, QueueStore, RemoteFileInfo, StorageProvider, SyncConfig, SyncEngine,
    SyncError, SyncResult,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Debug, Clone)]
pub struct MockFile {
    pub data: Vec<u8>,
    pub modified_at: DateTime<Utc>,
}

/// In-memory storage provider with failure injection and call
/// recording, for engine and resolver tests.
#[derive(Default)]
pub struct MockProvider {
    pub files: Mutex<HashMap<String, MockFile>>,
    authenticated: AtomicBool,
    fail_next: AtomicU32,
    unauthorized: AtomicBool,
    /// Upload attempts, including failed ones.
    pub upload_attempts: AtomicU32,
    /// Successfully uploaded paths, in delivery order.
    pub uploads: Mutex<Vec<String>>,
    /// Successfully deleted paths, in delivery order.
    pub deletes: Mutex<Vec<String>>,
    /// Notified whenever an upload attempt begins.
    pub entered_upload: Notify,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl MockProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            authenticated: AtomicBool::new(true),
            ..Self::default()
        })
    }

    pub fn set_authenticated(&self, value: bool) {
        self.authenticated.store(value, Ordering::SeqCst);
    }

    /// The next `n` upload/delete attempts fail with a retryable error.
    pub fn fail_next(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// All subsequent mutations fail with `Unauthorized`.
    pub fn revoke_auth(&self) {
        self.unauthorized.store(true, Ordering::SeqCst);
    }

    /// Undoes [`MockProvider::revoke_auth`].
    pub fn restore_auth(&self) {
        self.unauthorized.store(false, Ordering::SeqCst);
    }

    /// Makes upload attempts block until the returned `Notify` is
    /// notified (once per attempt).
    pub fn gate_uploads(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn insert_remote(&self, path: &str, data: &[u8], modified_at: DateTime<Utc>) {
        self.files.lock().unwrap().insert(
            path.to_string(),
            MockFile {
                data: data.to_vec(),
                modified_at,
            },
        );
    }

    pub fn remote_data(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).map(|f| f.data.clone())
    }

    pub fn upload_order(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    fn take_failure(&self) -> bool {
        self.fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn info_for(&self, path: &str, file: &MockFile) -> RemoteFileInfo {
        RemoteFileInfo {
            path: path.to_string(),
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            size: file.data.len() as u64,
            modified_at: file.modified_at,
            content_hash: None,
        }
    }
}

#[async_trait]
impl StorageProvider for MockProvider {
    fn provider_name(&self) -> &'static str {
        "Mock"
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    async fn authenticate(&self) -> SyncResult<Option<String>> {
        Ok(None)
    }

    async fn sign_out(&self) -> SyncResult<()> {
        self.authenticated.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn upload_data(&self, data: &[u8], path: &str) -> SyncResult<RemoteFileInfo> {
        self.entered_upload.notify_one();
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.upload_attempts.fetch_add(1, Ordering::SeqCst);
        if self.unauthorized.load(Ordering::SeqCst) {
            return Err(SyncError::Unauthorized);
        }
        if self.take_failure() {
            return Err(SyncError::UploadFailed("injected failure".to_string()));
        }

        self.uploads.lock().unwrap().push(path.to_string());
        let file = MockFile {
            data: data.to_vec(),
            modified_at: Utc::now(),
        };
        let info = self.info_for(path, &file);
        self.files.lock().unwrap().insert(path.to_string(), file);
        Ok(info)
    }

    async fn download_data(&self, path: &str) -> SyncResult<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .map(|f| f.data.clone())
            .ok_or_else(|| SyncError::FileNotFound(path.to_string()))
    }

    async fn delete_data(&self, path: &str) -> SyncResult<()> {
        if self.unauthorized.load(Ordering::SeqCst) {
            return Err(SyncError::Unauthorized);
        }
        if self.take_failure() {
            return Err(SyncError::Unknown("injected failure".to_string()));
        }
        self.deletes.lock().unwrap().push(path.to_string());
        self.files.lock().unwrap().remove(path);
        Ok(())
    }

    async fn list_files(&self, directory: &str) -> SyncResult<Vec<RemoteFileInfo>> {
        let prefix = format!("{directory}/");
        Ok(self
            .files
            .lock()
            .unwrap()
            .iter()
            .filter(|(path, _)| path.starts_with(&prefix))
            .map(|(path, file)| self.info_for(path, file))
            .collect())
    }

    async fn file_exists(&self, path: &str) -> SyncResult<bool> {
        Ok(self.files.lock().unwrap().contains_key(path))
    }

    async fn get_file_info(&self, path: &str) -> SyncResult<Option<RemoteFileInfo>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .get(path)
            .map(|f| self.info_for(path, f)))
    }
}

/// Installs a log subscriber once; set RUST_LOG to see engine traces.
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// An engine over a fresh temp-dir queue store and a driveable
/// connectivity state, with `provider` attached.
pub async fn make_engine(
    provider: Arc<MockProvider>,
    online: bool,
) -> (SyncEngine, Arc<ConnectivityState>, tempfile::TempDir) {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let monitor = Arc::new(ConnectivityState::new(online));
    let engine = SyncEngine::new(
        SyncConfig::default(),
        QueueStore::new(dir.path()),
        monitor.clone(),
    )
    .await;
    engine.set_provider(provider).await.unwrap();
    (engine, monitor, dir)
}
