//! Mirrored sensor state.
//!
//! Each sensor holds the latest value observed in the realtime tree and a
//! [`ChangeTracker`] whose version is bumped on every change. Readers (a render loop, the CLI)
//! compare versions or wait on a [`ChangeNotifier`] to learn about changes.
//!
//! All sensors implement the [`Sensor`] trait. Sensors that can wake a
//! waiting reader also implement [`NotifiableSensor`].

pub mod ambient_sensor;
pub mod change_tracker;
pub mod motion_sensor;
pub mod notifier;
pub mod numeric_sensor;

pub use ambient_sensor::{Ambient, AmbientSensor};
pub use change_tracker::ChangeTracker;
pub use motion_sensor::{MotionSensor, motion_detected};
pub use notifier::ChangeNotifier;
pub use numeric_sensor::NumericSensor;

/// Trait for sensors with change detection.
///
/// The version number is incremented atomically each time the sensor
/// value changes.
pub trait Sensor: Send + Sync {
    /// Get the current version number.
    fn version(&self) -> u32;
}

/// Trait for sensors that wake readers when their value changes.
pub trait NotifiableSensor: Sensor {
    /// Set the notifier for this sensor.
    fn set_notifier(&self, notifier: ChangeNotifier);
}
