//! Observable sync state.
//!
//! The engine publishes immutable [`SyncSnapshot`] values through a
//! `tokio::sync::watch` channel; consumers (e.g. a status UI) hold a
//! receiver and never touch engine internals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::conflict::SyncConflictItem;

/// Coarse status of the most recent sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// No pass is running and the last one (if any) ended cleanly.
    #[default]
    Idle,
    /// A pass is running.
    Syncing,
    /// A pass (or resolution) is uploading data.
    Uploading,
    /// A pass (or resolution) is downloading data.
    Downloading,
    /// The last pass ended with an unrecoverable error.
    Error,
    /// Divergences are pending resolution.
    Conflict,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Syncing => write!(f, "syncing"),
            Self::Uploading => write!(f, "uploading"),
            Self::Downloading => write!(f, "downloading"),
            Self::Error => write!(f, "error"),
            Self::Conflict => write!(f, "conflict"),
        }
    }
}

/// Point-in-time view of the engine, written only by the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncSnapshot {
    /// Status of the most recent pass.
    pub status: SyncStatus,
    /// Last reported connectivity.
    pub is_online: bool,
    /// Completion time of the last fully successful pass.
    pub last_sync: Option<DateTime<Utc>>,
    /// Message of the last pass-level error, if any.
    pub error: Option<String>,
    /// Progress of the current (or last) pass, 0.0–1.0.
    pub progress: f64,
    /// Number of mutations still queued.
    pub pending_count: usize,
    /// Divergences awaiting an explicit resolution.
    pub conflicts: Vec<SyncConflictItem>,
}
