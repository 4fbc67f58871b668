//! Error types for the host ports

use thiserror::Error;

use crate::ports::NotificationPermission;

/// Failure of a key-value store operation
///
/// The timer and autosave never surface these to the exam taker; they are
/// logged and the operation is skipped.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store contents are not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store lock poisoned: {0}")]
    Lock(String),
}

/// Failure to deliver a system notification
///
/// Never affects the countdown; the warning still fires.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Notification permission is {0:?}")]
    NotPermitted(NotificationPermission),

    #[error("Notification service unavailable: {0}")]
    Unavailable(String),
}
