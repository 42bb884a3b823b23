//! Change notifier for mirrored state.
//!
//! When a mirrored value changes, the reader that renders it has to wake up.
//! A single notifier is usually shared by every sensor of a mirror.

use std::sync::Arc;
use tokio::sync::Notify;

/// Wakes the reader of mirrored state when a value changes.
///
/// Notifications coalesce: if several values change before the reader
/// waits again, it wakes once.
///
/// Sensors reach it through their [`ChangeTracker`](super::ChangeTracker).
#[derive(Clone)]
pub struct ChangeNotifier {
    notify: Arc<Notify>,
    label: &'static str,
}

impl ChangeNotifier {
    pub fn new(label: &'static str) -> Self {
        Self {
            notify: Arc::new(Notify::new()),
            label,
        }
    }

    /// Name used in log lines.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Signal that mirrored data changed. Never blocks.
    pub fn notify(&self) {
        self.notify.notify_one();
    }

    /// Wait until something changed since the last wake-up.
    pub async fn changed(&self) {
        self.notify.notified().await;
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("label", &self.label)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_notify_before_wait_is_kept() {
        let notifier = ChangeNotifier::new("test");
        notifier.notify();
        tokio::time::timeout(Duration::from_millis(100), notifier.changed())
            .await
            .expect("pending notification should wake immediately");
    }

    #[tokio::test]
    async fn test_notifications_coalesce() {
        let notifier = ChangeNotifier::new("test");
        notifier.notify();
        notifier.notify();
        notifier.changed().await;

        let second = tokio::time::timeout(Duration::from_millis(20), notifier.changed()).await;
        assert!(second.is_err());
    }
}
