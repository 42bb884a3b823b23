//! Realtime key-value tree.
//!
//! The remote state of the house lives in a JSON tree addressed by
//! slash-separated paths. Consumers subscribe to a path and receive the
//! full value at that path on registration and after every change that
//! touches it. Writers `set` a single path, `update` several paths at once,
//! or `push` a new child with an ordered key.
//!
//! Backends:
//! - [`MemoryTree`]: in-process tree, optionally deferring delivery of writes
//! - [`MqttTree`]: retained MQTT topics under a prefix

mod client;
mod layout;
mod memory;
mod mqtt;
mod replica;

pub use client::{MqttClient, MqttMessage};
pub use layout::TreeLayout;
pub use memory::{Delivery, MemoryTree, TreeWrite};
pub use mqtt::MqttTree;

use crate::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// A remote tree that can be observed and written.
#[async_trait]
pub trait RealtimeTree: Send + Sync {
    /// Register interest in `path`.
    ///
    /// The current value (or `Null` when missing) is delivered first, then
    /// one value per remote change that touches the path.
    fn subscribe(&self, path: &str) -> Subscription;

    /// Replace the value at `path`. `Null` removes it.
    async fn set(&self, path: &str, value: Value) -> Result<()>;

    /// Write several paths as one remote operation.
    async fn update(&self, changes: Vec<(String, Value)>) -> Result<()>;

    /// Append `value` under `path` with a key that sorts after every
    /// previously pushed key. Returns the new key.
    async fn push(&self, path: &str, value: Value) -> Result<String> {
        let key = push_key();
        self.set(&join(path, &key), value).await?;
        Ok(key)
    }
}

/// Handle for a registered path listener.
///
/// Dropping or closing the handle unregisters it. Because [`close`] takes
/// the handle by value, nothing can be received after it returns.
///
/// [`close`]: Subscription::close
pub struct Subscription {
    path: String,
    rx: mpsc::UnboundedReceiver<Value>,
    _registration: replica::Registration,
}

impl Subscription {
    pub(crate) fn new(
        path: String,
        rx: mpsc::UnboundedReceiver<Value>,
        registration: replica::Registration,
    ) -> Self {
        Self {
            path,
            rx,
            _registration: registration,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Wait for the next value at this path.
    pub async fn recv(&mut self) -> Option<Value> {
        self.rx.recv().await
    }

    /// Take an already delivered value without waiting.
    pub fn try_recv(&mut self) -> Option<Value> {
        self.rx.try_recv().ok()
    }

    pub fn close(self) {}
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("path", &self.path)
            .finish()
    }
}

/// Split a path into its non-empty segments.
pub fn segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join a parent path and a child key.
pub fn join(parent: &str, child: &str) -> String {
    let parent = parent.trim_matches('/');
    let child = child.trim_matches('/');
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}/{child}")
    }
}

/// Generate a key that sorts after all keys generated before it.
///
/// Millisecond timestamp plus a process-wide sequence, both zero padded so
/// lexicographic order matches creation order.
pub fn push_key() -> String {
    static SEQ: AtomicU64 = AtomicU64::new(0);
    let millis = Utc::now().timestamp_millis().max(0);
    let seq = SEQ.fetch_add(1, Ordering::Relaxed) % 1_000_000;
    format!("{millis:013}-{seq:06}")
}
