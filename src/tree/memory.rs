//! In-process realtime tree.
//!
//! Writes are journaled and either delivered at once or queued until
//! [`MemoryTree::flush`], which models the round trip to a remote store.

use super::replica::Replica;
use super::{RealtimeTree, Subscription};
use crate::error::{Result, ShadowError};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// When writes issued through the tree become visible to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Immediate,
    Deferred,
}

/// One remote write as issued by a client.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeWrite {
    pub path: String,
    pub value: Value,
}

pub struct MemoryTree {
    replica: Arc<Replica>,
    delivery: Delivery,
    pending: Mutex<Vec<Vec<(String, Value)>>>,
    journal: Mutex<Vec<TreeWrite>>,
    reject_writes: AtomicBool,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::with_delivery(Delivery::Immediate)
    }

    /// A tree whose client writes stay invisible until [`flush`](Self::flush).
    pub fn deferred() -> Self {
        Self::with_delivery(Delivery::Deferred)
    }

    pub fn with_delivery(delivery: Delivery) -> Self {
        Self {
            replica: Replica::new(),
            delivery,
            pending: Mutex::new(Vec::new()),
            journal: Mutex::new(Vec::new()),
            reject_writes: AtomicBool::new(false),
        }
    }

    /// Write from the remote side (firmware, another client).
    ///
    /// Always delivered at once and not recorded in the journal.
    pub fn seed(&self, path: &str, value: Value) {
        self.replica.apply(&[(path.to_string(), value)]);
    }

    /// Deliver every queued write in issue order. Returns how many batches
    /// were applied.
    pub fn flush(&self) -> usize {
        let batches = std::mem::take(&mut *self.pending.lock());
        for batch in &batches {
            self.replica.apply(batch);
        }
        batches.len()
    }

    /// Every write issued through this tree, in order.
    pub fn writes(&self) -> Vec<TreeWrite> {
        self.journal.lock().clone()
    }

    /// Issued writes whose path starts with `prefix`.
    pub fn writes_under(&self, prefix: &str) -> Vec<TreeWrite> {
        let prefix = prefix.trim_matches('/');
        self.journal
            .lock()
            .iter()
            .filter(|w| w.path.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn read(&self, path: &str) -> Value {
        self.replica.read(path)
    }

    /// Make subsequent client writes fail as a remote error would.
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    pub fn listener_count(&self) -> usize {
        self.replica.listener_count()
    }

    fn write(&self, batch: Vec<(String, Value)>) -> Result<()> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(ShadowError::Tree("write rejected by remote".into()));
        }

        self.journal
            .lock()
            .extend(batch.iter().map(|(path, value)| TreeWrite {
                path: path.trim_matches('/').to_string(),
                value: value.clone(),
            }));

        match self.delivery {
            Delivery::Immediate => self.replica.apply(&batch),
            Delivery::Deferred => self.pending.lock().push(batch),
        }
        Ok(())
    }
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RealtimeTree for MemoryTree {
    fn subscribe(&self, path: &str) -> Subscription {
        self.replica.register(path)
    }

    async fn set(&self, path: &str, value: Value) -> Result<()> {
        self.write(vec![(path.to_string(), value)])
    }

    async fn update(&self, changes: Vec<(String, Value)>) -> Result<()> {
        self.write(changes)
    }
}
