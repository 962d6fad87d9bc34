//! Sync status indicator

use std::fmt;

/// Phase of the sync indicator
///
/// `Success` and `Error` fall back to `Idle` after a display period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Nothing to show
    Idle,
    /// A sync cycle is in flight
    Syncing,
    /// Last cycle completed
    Success,
    /// Last cycle failed
    Error,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SyncStatus::Idle => "idle",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Success => "success",
            SyncStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// Status plus the user-facing message shown with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub status: SyncStatus,
    pub message: String,
}

impl StatusReport {
    pub fn idle() -> Self {
        Self {
            status: SyncStatus::Idle,
            message: String::new(),
        }
    }

    pub fn new(status: SyncStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl Default for StatusReport {
    fn default() -> Self {
        Self::idle()
    }
}

/// What a call to `SyncEngine::sync` ended with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Remote record existed; merged result stored locally and pushed
    Merged,
    /// No remote record; local snapshot pushed as the new record
    Uploaded,
    /// Cycle failed; `transient` failures may succeed on a later trigger
    Failed { message: String, transient: bool },
    /// No cycle ran (sync not set up or not enabled)
    Skipped,
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Merged | SyncOutcome::Uploaded)
    }
}

/// Events emitted by the sync engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Status indicator changed
    StatusChanged(StatusReport),
    /// Local documents were replaced by a merge; re-render from the store
    LocalStateReplaced,
}
