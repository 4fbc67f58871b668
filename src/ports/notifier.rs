//! System notification collaborator

use tracing::info;

use crate::error::NotifyError;

/// Permission state reported by the host notification system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPermission {
    Granted,
    Denied,
    /// The user has not been asked yet
    Default,
}

/// One-shot system notifications
pub trait Notifier: Send + Sync {
    fn permission(&self) -> NotificationPermission;
    fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError>;
}

/// Notifier that writes notifications to the log
#[derive(Debug, Clone, Copy)]
pub struct LogNotifier {
    permission: NotificationPermission,
}

impl LogNotifier {
    pub fn new(granted: bool) -> Self {
        Self {
            permission: if granted {
                NotificationPermission::Granted
            } else {
                NotificationPermission::Default
            },
        }
    }
}

impl Notifier for LogNotifier {
    fn permission(&self) -> NotificationPermission {
        self.permission
    }

    fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        if self.permission != NotificationPermission::Granted {
            return Err(NotifyError::NotPermitted(self.permission));
        }
        info!("Notification: {} - {}", title, body);
        Ok(())
    }
}
