//! Motion detector state.

use super::{ChangeNotifier, ChangeTracker, NotifiableSensor, Sensor};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};

/// Only `1` and `true` count as motion. Anything else, a missing value
/// included, reads as no motion.
pub fn motion_detected(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() == Some(1.0),
        _ => false,
    }
}

#[derive(Default)]
pub struct MotionSensor {
    detected: AtomicBool,
    changes: ChangeTracker,
}

impl MotionSensor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn detected(&self) -> bool {
        self.detected.load(Ordering::SeqCst)
    }

    pub fn apply(&self, value: &Value) {
        let detected = motion_detected(value);
        if self.detected.swap(detected, Ordering::SeqCst) != detected {
            self.changes.record_change();
        }
    }
}

impl NotifiableSensor for MotionSensor {
    fn set_notifier(&self, notifier: ChangeNotifier) {
        self.changes.set_notifier(notifier);
    }
}

impl Sensor for MotionSensor {
    fn version(&self) -> u32 {
        self.changes.version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_motion_values() {
        assert!(motion_detected(&json!(1)));
        assert!(motion_detected(&json!(true)));
        assert!(!motion_detected(&json!(0)));
        assert!(!motion_detected(&json!(2)));
        assert!(!motion_detected(&json!("1")));
        assert!(!motion_detected(&Value::Null));
    }

    #[test]
    fn test_only_changes_bump_version() {
        let sensor = MotionSensor::new();
        sensor.apply(&json!(0));
        assert_eq!(sensor.version(), 0);

        sensor.apply(&json!(1));
        sensor.apply(&json!(true));
        assert!(sensor.detected());
        assert_eq!(sensor.version(), 1);

        sensor.apply(&Value::Null);
        assert!(!sensor.detected());
        assert_eq!(sensor.version(), 2);
    }
}
