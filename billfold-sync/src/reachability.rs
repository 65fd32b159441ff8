//! Network reachability observation.
//!
//! The engine consumes a boolean "is connected" signal plus change
//! notifications; any transition to connected while the queue is
//! non-empty and the engine idle triggers a pass.

use tokio::sync::watch;

/// A source of connectivity information.
pub trait NetworkMonitor: Send + Sync {
    /// Current connectivity.
    fn is_online(&self) -> bool;

    /// A receiver that yields on every connectivity change.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// A watch-backed connectivity state, driven by platform glue (or by
/// tests) via [`ConnectivityState::set_online`].
#[derive(Debug)]
pub struct ConnectivityState {
    tx: watch::Sender<bool>,
}

impl ConnectivityState {
    /// Creates a connectivity state with the given initial value.
    pub fn new(initially_online: bool) -> Self {
        let (tx, _) = watch::channel(initially_online);
        Self { tx }
    }

    /// Convenience constructor: starts online.
    pub fn online() -> Self {
        Self::new(true)
    }

    /// Convenience constructor: starts offline.
    pub fn offline() -> Self {
        Self::new(false)
    }

    /// Reports a connectivity change. Unchanged values are not
    /// re-broadcast.
    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            let changed = *current != online;
            *current = online;
            changed
        });
    }
}

impl NetworkMonitor for ConnectivityState {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
