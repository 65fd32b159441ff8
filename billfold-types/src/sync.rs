//! The sync vocabulary: what kind of mutation is pending, and how
//! urgently it should be delivered.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of mutation a queued sync item carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOperation {
    /// The record was created locally and does not exist remotely yet.
    Create,
    /// The record exists remotely and was modified locally.
    Update,
    /// The record was deleted locally.
    Delete,
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Delivery priority for a queued sync item.
///
/// Higher priorities are served first; ties are broken by enqueue time.
/// The derived `Ord` follows declaration order, so `Low < Normal <
/// High < Urgent`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SyncPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl fmt::Display for SyncPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Normal => write!(f, "normal"),
            Self::High => write!(f, "high"),
            Self::Urgent => write!(f, "urgent"),
        }
    }
}
