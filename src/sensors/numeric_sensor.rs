//! Numeric sensor state (temperature, humidity).

use super::{ChangeNotifier, ChangeTracker, NotifiableSensor, Sensor};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe numeric reading stored as `f64` bits.
pub struct NumericSensor {
    bits: AtomicU64,
    changes: ChangeTracker,
}

impl NumericSensor {
    pub fn new(initial: f64) -> Self {
        Self {
            bits: AtomicU64::new(initial.to_bits()),
            changes: ChangeTracker::new(),
        }
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }

    /// Store a reading. Increments version if the value changed.
    pub fn set(&self, value: f64) {
        let old = f64::from_bits(self.bits.swap(value.to_bits(), Ordering::SeqCst));
        if old.to_bits() != value.to_bits() {
            self.changes.record_change();
        }
    }

    /// Mirror a remote value as-is; anything that is not a number reads as `0`.
    pub fn apply(&self, value: &Value) {
        self.set(value.as_f64().unwrap_or(0.0));
    }
}

impl NotifiableSensor for NumericSensor {
    fn set_notifier(&self, notifier: ChangeNotifier) {
        self.changes.set_notifier(notifier);
    }
}

impl Sensor for NumericSensor {
    fn version(&self) -> u32 {
        self.changes.version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_apply_keeps_value_untransformed() {
        let sensor = NumericSensor::new(0.0);
        sensor.apply(&json!(23.4));
        assert_eq!(sensor.get(), 23.4);
        assert_eq!(sensor.version(), 1);

        sensor.apply(&json!(23.4));
        assert_eq!(sensor.version(), 1);
    }

    #[test]
    fn test_missing_value_defaults_to_zero() {
        let sensor = NumericSensor::new(12.0);
        sensor.apply(&Value::Null);
        assert_eq!(sensor.get(), 0.0);

        sensor.apply(&json!("hot"));
        assert_eq!(sensor.get(), 0.0);
    }
}
