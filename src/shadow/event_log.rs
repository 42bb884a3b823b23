//! Append-only event log.
//!
//! [`EventLog`] writes entries to the remote ordered collection.
//! [`LogView`] is the mirrored, capped, newest-first view of it. Entries
//! past the cap stay in the remote store; they are just not shown.

use crate::error::Result;
use crate::sensors::{ChangeNotifier, ChangeTracker, NotifiableSensor, Sensor};
use crate::tree::RealtimeTree;
use chrono::{Local, NaiveTime};
use log::debug;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

/// Entries kept by the view.
pub const LOG_CAPACITY: usize = 50;

/// One mirrored log line. `key` orders entries by insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub key: String,
    pub text: String,
}

/// `"[HH:MM:SS] text"`
pub fn format_entry(at: NaiveTime, text: &str) -> String {
    format!("[{}] {}", at.format("%H:%M:%S"), text)
}

#[derive(Clone)]
pub struct EventLog {
    tree: Arc<dyn RealtimeTree>,
    path: String,
}

impl EventLog {
    pub fn new(tree: Arc<dyn RealtimeTree>, path: impl Into<String>) -> Self {
        Self {
            tree,
            path: path.into(),
        }
    }

    /// Push a new entry stamped with the local time. Returns its key.
    pub async fn append(&self, text: &str) -> Result<String> {
        let line = format_entry(Local::now().time(), text);
        debug!("[Log] {}", line);
        self.tree.push(&self.path, Value::String(line)).await
    }
}

pub struct LogView {
    entries: RwLock<Vec<LogEntry>>,
    changes: ChangeTracker,
}

impl LogView {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            changes: ChangeTracker::new(),
        }
    }

    /// Newest first, at most [`LOG_CAPACITY`] entries.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.read().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.entries.read().iter().map(|e| e.text.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Rebuild the view from the remote collection.
    pub fn apply(&self, value: &Value) {
        let mut entries: Vec<LogEntry> = match value {
            Value::Object(map) => {
                let mut entries: Vec<LogEntry> = map
                    .iter()
                    .map(|(key, v)| LogEntry {
                        key: key.clone(),
                        text: entry_text(v),
                    })
                    .collect();
                entries.sort_by(|a, b| a.key.cmp(&b.key));
                entries
            }
            Value::Array(items) => items
                .iter()
                .enumerate()
                .filter(|(_, v)| !v.is_null())
                .map(|(i, v)| LogEntry {
                    key: format!("{i:013}"),
                    text: entry_text(v),
                })
                .collect(),
            _ => Vec::new(),
        };

        entries.reverse();
        entries.truncate(LOG_CAPACITY);

        let changed = {
            let mut current = self.entries.write();
            let changed = *current != entries;
            *current = entries;
            changed
        };

        if changed {
            self.changes.record_change();
        }
    }
}

impl Default for LogView {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifiableSensor for LogView {
    fn set_notifier(&self, notifier: ChangeNotifier) {
        self.changes.set_notifier(notifier);
    }
}

impl Sensor for LogView {
    fn version(&self) -> u32 {
        self.changes.version()
    }
}

fn entry_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
