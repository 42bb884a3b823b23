//! Version counter plus optional notifier shared by every mirrored value.

use super::ChangeNotifier;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Default)]
pub struct ChangeTracker {
    version: AtomicU32,
    notifier: RwLock<Option<ChangeNotifier>>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u32 {
        self.version.load(Ordering::SeqCst)
    }

    pub fn set_notifier(&self, notifier: ChangeNotifier) {
        *self.notifier.write() = Some(notifier);
    }

    /// Bump the version and wake the reader, if one is attached.
    pub fn record_change(&self) {
        self.version.fetch_add(1, Ordering::SeqCst);
        if let Some(notifier) = self.notifier.read().as_ref() {
            notifier.notify();
        }
    }
}
