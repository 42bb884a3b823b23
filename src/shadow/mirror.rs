//! State mirror: local projection of the remote house state.
//!
//! The mirror subscribes to the sensor, light and log paths of the tree and
//! rewrites its local state on every notification. It is the only writer of
//! that state. Commands write to the tree and see their effect here once the
//! change comes back.

use super::event_log::LogView;
use super::lights::LightBank;
use crate::sensors::{
    Ambient, AmbientSensor, ChangeNotifier, MotionSensor, NotifiableSensor, NumericSensor, Sensor,
};
use crate::tree::{RealtimeTree, Subscription, TreeLayout};
use futures_util::stream::{self, BoxStream, StreamExt};
use log::{debug, info};
use serde_json::Value;
use std::sync::Arc;
use strum::{Display, EnumIter, IntoEnumIterator};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// The four mirrored sensor readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum SensorName {
    Temperature,
    Humidity,
    Motion,
    #[strum(serialize = "Ambient light")]
    AmbientLight,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReadingValue {
    Number(f64),
    Flag(bool),
    Ambient(Ambient),
}

impl std::fmt::Display for ReadingValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadingValue::Number(n) => write!(f, "{n}"),
            ReadingValue::Flag(b) => write!(f, "{}", if *b { "detected" } else { "none" }),
            ReadingValue::Ambient(a) => write!(f, "{a}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub name: SensorName,
    pub value: ReadingValue,
}

/// Which part of the mirror a tree value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorTarget {
    Sensor(SensorName),
    Lights,
    Log,
}

pub struct StateMirror {
    temperature: NumericSensor,
    humidity: NumericSensor,
    motion: MotionSensor,
    ambient: AmbientSensor,
    lights: LightBank,
    log: LogView,
    notifier: ChangeNotifier,
}

impl StateMirror {
    /// A mirror with default readings. Every part shares one notifier.
    pub fn new() -> Arc<Self> {
        let mirror = Self {
            temperature: NumericSensor::new(0.0),
            humidity: NumericSensor::new(0.0),
            motion: MotionSensor::new(),
            ambient: AmbientSensor::new(Ambient::Light),
            lights: LightBank::new(),
            log: LogView::new(),
            notifier: ChangeNotifier::new("mirror"),
        };

        mirror.temperature.set_notifier(mirror.notifier.clone());
        mirror.humidity.set_notifier(mirror.notifier.clone());
        mirror.motion.set_notifier(mirror.notifier.clone());
        mirror.ambient.set_notifier(mirror.notifier.clone());
        mirror.lights.set_notifier(mirror.notifier.clone());
        mirror.log.set_notifier(mirror.notifier.clone());

        Arc::new(mirror)
    }

    /// Rewrite one part of the mirror from a tree value.
    pub fn apply(&self, target: MirrorTarget, value: &Value) {
        debug!("[Mirror] {:?} <- {}", target, value);
        match target {
            MirrorTarget::Sensor(SensorName::Temperature) => self.temperature.apply(value),
            MirrorTarget::Sensor(SensorName::Humidity) => self.humidity.apply(value),
            MirrorTarget::Sensor(SensorName::Motion) => self.motion.apply(value),
            MirrorTarget::Sensor(SensorName::AmbientLight) => self.ambient.apply(value),
            MirrorTarget::Lights => self.lights.apply(value),
            MirrorTarget::Log => self.log.apply(value),
        }
    }

    /// Subscribe to every mirrored path and keep the mirror current.
    ///
    /// Subscriptions are registered before this returns, so the initial
    /// values are never missed. The returned task owns them.
    pub fn attach(self: &Arc<Self>, tree: &dyn RealtimeTree, layout: &TreeLayout) -> MirrorTask {
        let routes = [
            (&layout.temperature, MirrorTarget::Sensor(SensorName::Temperature)),
            (&layout.humidity, MirrorTarget::Sensor(SensorName::Humidity)),
            (&layout.motion, MirrorTarget::Sensor(SensorName::Motion)),
            (&layout.ambient, MirrorTarget::Sensor(SensorName::AmbientLight)),
            (&layout.lights, MirrorTarget::Lights),
            (&layout.events, MirrorTarget::Log),
        ];

        let streams: Vec<BoxStream<'static, (MirrorTarget, Value)>> = routes
            .into_iter()
            .map(|(path, target)| routed(tree.subscribe(path), target))
            .collect();
        let mut updates = stream::select_all(streams);

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let mirror = Arc::clone(self);

        let handle = tokio::spawn(async move {
            info!("[Mirror] Attached");
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    next = updates.next() => match next {
                        Some((target, value)) => mirror.apply(target, &value),
                        None => break,
                    },
                }
            }
            info!("[Mirror] Detached");
        });

        MirrorTask {
            token,
            handle: Some(handle),
        }
    }

    pub fn temperature(&self) -> f64 {
        self.temperature.get()
    }

    pub fn humidity(&self) -> f64 {
        self.humidity.get()
    }

    pub fn motion(&self) -> bool {
        self.motion.detected()
    }

    pub fn ambient(&self) -> Ambient {
        self.ambient.get()
    }

    pub fn lights(&self) -> &LightBank {
        &self.lights
    }

    pub fn log(&self) -> &LogView {
        &self.log
    }

    pub fn reading(&self, name: SensorName) -> SensorReading {
        let value = match name {
            SensorName::Temperature => ReadingValue::Number(self.temperature()),
            SensorName::Humidity => ReadingValue::Number(self.humidity()),
            SensorName::Motion => ReadingValue::Flag(self.motion()),
            SensorName::AmbientLight => ReadingValue::Ambient(self.ambient()),
        };
        SensorReading { name, value }
    }

    pub fn readings(&self) -> Vec<SensorReading> {
        SensorName::iter().map(|name| self.reading(name)).collect()
    }

    /// Sum of all part versions; grows whenever any mirrored value changes.
    pub fn version(&self) -> u64 {
        [
            self.temperature.version(),
            self.humidity.version(),
            self.motion.version(),
            self.ambient.version(),
            self.lights.version(),
            self.log.version(),
        ]
        .into_iter()
        .map(u64::from)
        .sum()
    }

    /// Wait until any mirrored value changes.
    pub async fn changed(&self) {
        self.notifier.changed().await;
    }

    /// Wait until the light bank has been written by the tree at least once.
    ///
    /// Sensor or log changes that arrive first do not end the wait. A tree
    /// whose light node matches the defaults never ends it either, so
    /// callers bound it with a timeout.
    pub async fn wait_for_lights(&self) {
        while self.lights.version() == 0 {
            self.changed().await;
        }
    }
}

fn routed(sub: Subscription, target: MirrorTarget) -> BoxStream<'static, (MirrorTarget, Value)> {
    stream::unfold(sub, move |mut sub| async move {
        let value = sub.recv().await?;
        Some(((target, value), sub))
    })
    .boxed()
}

/// Running mirror attachment.
///
/// Dropping it stops the task; [`close`](MirrorTask::close) also waits for
/// the task to finish, after which no tree value reaches the mirror.
pub struct MirrorTask {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl MirrorTask {
    pub async fn close(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for MirrorTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
