//! Ambient light sensor state.

use super::{ChangeNotifier, ChangeTracker, NotifiableSensor, Sensor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU8, Ordering};
use strum::{Display, FromRepr};

/// Ambient light level reported by the house.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, FromRepr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum Ambient {
    /// Fallback when the reading is missing or unknown.
    #[default]
    Light = 0,
    Dark = 1,
}

impl Ambient {
    /// The firmware writes `"oscuro"` for dark; everything else is light.
    pub fn from_value(value: &Value) -> Self {
        match value.as_str() {
            Some("oscuro") | Some("dark") => Ambient::Dark,
            _ => Ambient::Light,
        }
    }
}

pub struct AmbientSensor {
    level: AtomicU8,
    changes: ChangeTracker,
}

impl AmbientSensor {
    pub fn new(initial: Ambient) -> Self {
        Self {
            level: AtomicU8::new(initial as u8),
            changes: ChangeTracker::new(),
        }
    }

    pub fn get(&self) -> Ambient {
        Ambient::from_repr(self.level.load(Ordering::SeqCst)).unwrap_or_default()
    }

    pub fn set(&self, level: Ambient) {
        let old = self.level.swap(level as u8, Ordering::SeqCst);
        if old != level as u8 {
            self.changes.record_change();
        }
    }

    pub fn apply(&self, value: &Value) {
        self.set(Ambient::from_value(value));
    }
}

impl NotifiableSensor for AmbientSensor {
    fn set_notifier(&self, notifier: ChangeNotifier) {
        self.changes.set_notifier(notifier);
    }
}

impl Sensor for AmbientSensor {
    fn version(&self) -> u32 {
        self.changes.version()
    }
}
