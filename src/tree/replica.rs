//! Local copy of a realtime tree with path listeners.
//!
//! Shared by every tree backend: the backend decides *when* a change is
//! applied (immediately, on flush, on broker echo), the replica stores it
//! and fans it out to the listeners whose path overlaps the change.

use super::{Subscription, segments};
use log::debug;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;

struct Listener {
    id: u64,
    segments: Vec<String>,
    tx: mpsc::UnboundedSender<Value>,
}

pub(crate) struct Replica {
    root: RwLock<Value>,
    listeners: Mutex<Vec<Listener>>,
    next_id: AtomicU64,
}

impl Replica {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            root: RwLock::new(Value::Object(Map::new())),
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        })
    }

    /// Current value at `path`, `Null` when missing.
    pub fn read(&self, path: &str) -> Value {
        read_at(&self.root.read(), &segments(path))
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Apply a batch of writes, then notify each overlapping listener once.
    pub fn apply(&self, changes: &[(String, Value)]) {
        let changed: Vec<Vec<String>> = changes.iter().map(|(p, _)| segments(p)).collect();

        {
            let mut root = self.root.write();
            for ((_, value), segs) in changes.iter().zip(&changed) {
                write_at(&mut root, segs, value.clone());
            }
        }

        let mut listeners = self.listeners.lock();
        let root = self.root.read();
        listeners.retain(|listener| {
            let touched = changed
                .iter()
                .any(|c| overlaps(&listener.segments, c));
            if !touched {
                return true;
            }
            let value = read_at(&root, &listener.segments)
                .cloned()
                .unwrap_or(Value::Null);
            // Receiver gone means the subscription was dropped mid-flight
            listener.tx.send(value).is_ok()
        });
    }

    pub fn register(self: &Arc<Self>, path: &str) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let segs = segments(path);
        let (tx, rx) = mpsc::unbounded_channel();

        {
            let mut listeners = self.listeners.lock();
            let initial = read_at(&self.root.read(), &segs)
                .cloned()
                .unwrap_or(Value::Null);
            let _ = tx.send(initial);
            listeners.push(Listener {
                id,
                segments: segs,
                tx,
            });
        }

        debug!("Listener {} registered on '{}'", id, path);
        Subscription::new(
            path.to_string(),
            rx,
            Registration {
                id,
                replica: Arc::downgrade(self),
            },
        )
    }

    fn unregister(&self, id: u64) {
        self.listeners.lock().retain(|l| l.id != id);
        debug!("Listener {} unregistered", id);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

/// Unregisters its listener when dropped.
pub(crate) struct Registration {
    id: u64,
    replica: Weak<Replica>,
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(replica) = self.replica.upgrade() {
            replica.unregister(self.id);
        }
    }
}

fn overlaps(a: &[String], b: &[String]) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

fn read_at<'a>(root: &'a Value, segs: &[String]) -> Option<&'a Value> {
    let mut node = root;
    for seg in segs {
        node = match node {
            Value::Object(map) => map.get(seg)?,
            Value::Array(items) => items.get(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(node)
}

fn write_at(root: &mut Value, segs: &[String], value: Value) {
    let Some((last, parents)) = segs.split_last() else {
        *root = value;
        return;
    };

    if value.is_null() {
        remove_at(root, segs);
        return;
    }

    let mut node = root;
    for seg in parents {
        node = as_object(node)
            .entry(seg.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    as_object(node).insert(last.clone(), value);
}

fn remove_at(root: &mut Value, segs: &[String]) {
    let Some((last, parents)) = segs.split_last() else {
        return;
    };

    let mut node = root;
    for seg in parents {
        if !is_container(node) {
            return;
        }
        match as_object(node).get_mut(seg) {
            Some(child) => node = child,
            None => return,
        }
    }
    if is_container(node) {
        as_object(node).remove(last);
    }
}

fn is_container(node: &Value) -> bool {
    node.is_object() || node.is_array()
}

/// View `node` as an object, converting arrays to index-keyed objects and
/// replacing scalars.
fn as_object(node: &mut Value) -> &mut Map<String, Value> {
    match node {
        Value::Object(_) => {}
        Value::Array(items) => {
            let map = items
                .drain(..)
                .enumerate()
                .filter(|(_, v)| !v.is_null())
                .map(|(i, v)| (i.to_string(), v))
                .collect();
            *node = Value::Object(map);
        }
        _ => *node = Value::Object(Map::new()),
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was converted to an object above"),
    }
}
