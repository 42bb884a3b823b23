//! Mirrored state of the dimmable lights.

use crate::sensors::{ChangeNotifier, ChangeTracker, NotifiableSensor, Sensor};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;

pub const LIGHT_COUNT: usize = 4;

/// Intensity written when a light is switched on.
pub const FULL_INTENSITY: u8 = 255;

const LIGHT_LABELS: [&str; LIGHT_COUNT] = ["Bathroom", "Main bedroom", "Second bedroom", "Guest room"];

/// Room name of light `index`.
pub fn light_label(index: usize) -> Option<&'static str> {
    LIGHT_LABELS.get(index).copied()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActuatorState {
    pub is_on: bool,
    pub intensity: u8,
}

/// Read-only projection of the remote light structure.
///
/// Only [`apply`](LightBank::apply) changes it, and only the mirror calls
/// that. Commands never touch this state.
pub struct LightBank {
    slots: RwLock<[ActuatorState; LIGHT_COUNT]>,
    changes: ChangeTracker,
}

impl LightBank {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new([ActuatorState::default(); LIGHT_COUNT]),
            changes: ChangeTracker::new(),
        }
    }

    pub fn get(&self, index: usize) -> Option<ActuatorState> {
        self.slots.read().get(index).copied()
    }

    pub fn all(&self) -> [ActuatorState; LIGHT_COUNT] {
        *self.slots.read()
    }

    /// Replace every slot from the remote light node.
    ///
    /// The node may be an array or an object keyed by index. Missing
    /// lights read as off with zero intensity.
    pub fn apply(&self, value: &Value) {
        let mut next = [ActuatorState::default(); LIGHT_COUNT];
        for (index, slot) in next.iter_mut().enumerate() {
            if let Some(node) = light_node(value, index) {
                slot.is_on = node.get("state").is_some_and(is_truthy);
                slot.intensity = node.get("pwm").map(intensity).unwrap_or(0);
            }
        }

        let changed = {
            let mut slots = self.slots.write();
            let changed = *slots != next;
            *slots = next;
            changed
        };

        if changed {
            self.changes.record_change();
        }
    }
}

impl Default for LightBank {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifiableSensor for LightBank {
    fn set_notifier(&self, notifier: ChangeNotifier) {
        self.changes.set_notifier(notifier);
    }
}

impl Sensor for LightBank {
    fn version(&self) -> u32 {
        self.changes.version()
    }
}

fn light_node(value: &Value, index: usize) -> Option<&Value> {
    match value {
        Value::Array(items) => items.get(index),
        Value::Object(map) => map.get(&index.to_string()),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn intensity(value: &Value) -> u8 {
    value
        .as_f64()
        .map(|f| f.round().clamp(0.0, f64::from(FULL_INTENSITY)) as u8)
        .unwrap_or(0)
}
