//! Sync error types

use std::time::Duration;

use thiserror::Error;

use crate::models::SettingsError;
use crate::storage::StorageError;

/// Failure talking to the remote document store
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Server answered with a non-success status
    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },

    #[error("Request timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),

    /// Connection, TLS or body transfer failure
    #[error("{0}")]
    Transport(String),
}

/// Errors surfaced by the sync subsystem
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Remote record is not a valid diary document
    #[error("Invalid remote document: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("No sync code configured. Set a sync code in settings first.")]
    NoSyncCode,

    #[error("Invalid settings: {0}")]
    InvalidSettings(#[from] SettingsError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl SyncError {
    /// True for failures that may succeed on a later attempt
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SyncError::Network(NetworkError::Timeout(_) | NetworkError::Transport(_))
        ) || matches!(self, SyncError::Network(NetworkError::Status { status, .. }) if *status >= 500)
    }
}

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        let err = SyncError::from(NetworkError::Status {
            status: 500,
            reason: "Internal Server Error".to_string(),
        });
        assert_eq!(err.to_string(), "Network error: HTTP 500: Internal Server Error");
        assert!(err.is_transient());
    }

    #[test]
    fn test_timeout_display() {
        let err = SyncError::from(NetworkError::Timeout(Duration::from_secs(10)));
        assert!(err.to_string().contains("timed out after 10s"));
        assert!(err.is_transient());
    }

    #[test]
    fn test_client_errors_are_not_transient() {
        let err = SyncError::from(NetworkError::Status {
            status: 401,
            reason: "Unauthorized".to_string(),
        });
        assert!(!err.is_transient());
        assert!(!SyncError::NoSyncCode.is_transient());
    }
}
