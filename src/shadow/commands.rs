//! Command channel: writes actuator commands to the tree.
//!
//! Every command logs one event entry, even when the write itself fails.
//! Local state is never changed here; the mirror picks the new value up
//! from the tree.

use super::event_log::EventLog;
use super::lights::{FULL_INTENSITY, light_label};
use super::mirror::StateMirror;
use crate::error::{Result, ShadowError, ValidationError};
use crate::role::Role;
use crate::tree::{RealtimeTree, TreeLayout};
use log::{info, warn};
use serde_json::{Value, json};
use std::sync::Arc;
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CurtainDirection {
    Up,
    Down,
    Stop,
}

pub struct CommandChannel {
    tree: Arc<dyn RealtimeTree>,
    log: EventLog,
    mirror: Arc<StateMirror>,
    layout: TreeLayout,
    role: Role,
}

impl CommandChannel {
    pub fn new(
        tree: Arc<dyn RealtimeTree>,
        mirror: Arc<StateMirror>,
        layout: TreeLayout,
        role: Role,
    ) -> Self {
        let log = EventLog::new(Arc::clone(&tree), layout.events.clone());
        Self {
            tree,
            log,
            mirror,
            layout,
            role,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub async fn set_curtain(&self, direction: CurtainDirection) -> Result<()> {
        let written = self
            .tree
            .set(&self.layout.curtain_command, json!(direction.to_string()))
            .await;
        self.finish(written, format!("Curtain: {direction}")).await
    }

    /// Arm or disarm the alarm. Only the father may do this; anyone else
    /// gets [`ShadowError::AccessDenied`] and nothing is written or logged.
    pub async fn set_alarm(&self, active: bool) -> Result<()> {
        if !self.role.can_control_alarm() {
            warn!("[Command] Alarm change refused for role {}", self.role);
            return Err(ShadowError::AccessDenied);
        }

        let written = self
            .tree
            .set(&self.layout.alarm_active, Value::Bool(active))
            .await;
        let text = if active { "Alarm armed" } else { "Alarm disarmed" };
        self.finish(written, text.to_string()).await
    }

    /// Flip light `index` based on its mirrored state. State and intensity
    /// go out in a single update. Returns the requested state.
    pub async fn toggle_light(&self, index: usize) -> Result<bool> {
        let label = checked_label(index)?;
        let current = self.mirror.lights().get(index).unwrap_or_default();
        let next = !current.is_on;
        let intensity = if next { FULL_INTENSITY } else { 0 };

        let written = self
            .tree
            .update(vec![
                (self.layout.light_state(index), Value::Bool(next)),
                (self.layout.light_pwm(index), json!(intensity)),
            ])
            .await;
        let text = format!("{label}: {}", if next { "on" } else { "off" });
        self.finish(written, text).await?;
        Ok(next)
    }

    /// Set the intensity of light `index` without touching its on/off state.
    pub async fn set_light_intensity(&self, index: usize, intensity: u8) -> Result<()> {
        let label = checked_label(index)?;
        let written = self
            .tree
            .set(&self.layout.light_pwm(index), json!(intensity))
            .await;
        self.finish(written, format!("{label} intensity: {intensity}")).await
    }

    /// Log the command, then report the write outcome.
    async fn finish(&self, written: Result<()>, text: String) -> Result<()> {
        let logged = self.log.append(&text).await;
        match written {
            Ok(()) => {
                info!("[Command] {}", text);
                logged.map(|_| ())
            }
            Err(e) => {
                warn!("[Command] {} failed: {}", text, e);
                Err(e)
            }
        }
    }
}

fn checked_label(index: usize) -> Result<&'static str> {
    light_label(index).ok_or(ShadowError::Validation(ValidationError::UnknownLight(index)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shadow::mirror::MirrorTarget;
    use crate::tree::{MemoryTree, Subscription};
    use async_trait::async_trait;
    use std::str::FromStr;

    fn channel(tree: Arc<MemoryTree>, role: Role) -> (CommandChannel, Arc<StateMirror>) {
        let mirror = StateMirror::new();
        let channel = CommandChannel::new(tree, Arc::clone(&mirror), TreeLayout::default(), role);
        (channel, mirror)
    }

    fn log_texts(tree: &MemoryTree) -> Vec<String> {
        tree.writes_under("Eventos")
            .into_iter()
            .filter_map(|w| w.value.as_str().map(str::to_string))
            .collect()
    }

    #[test]
    fn test_curtain_direction_strings() {
        assert_eq!(CurtainDirection::Up.to_string(), "up");
        assert_eq!(CurtainDirection::from_str("STOP").unwrap(), CurtainDirection::Stop);
        assert!(CurtainDirection::from_str("sideways").is_err());
    }

    #[tokio::test]
    async fn test_curtain_writes_command_and_logs() {
        let tree = Arc::new(MemoryTree::new());
        let (channel, _) = channel(Arc::clone(&tree), Role::Child);

        channel.set_curtain(CurtainDirection::Down).await.unwrap();
        assert_eq!(tree.read("Curtain/command"), json!("down"));

        let texts = log_texts(&tree);
        assert_eq!(texts.len(), 1);
        assert!(texts[0].ends_with("] Curtain: down"));
    }

    #[tokio::test]
    async fn test_alarm_requires_father() {
        for role in [Role::Mother, Role::Child] {
            let tree = Arc::new(MemoryTree::new());
            let (channel, _) = channel(Arc::clone(&tree), role);

            let err = channel.set_alarm(true).await.unwrap_err();
            assert!(matches!(err, ShadowError::AccessDenied));
            assert_eq!(err.dialog().title, "Access denied");
            assert!(tree.writes().is_empty());
        }
    }

    #[tokio::test]
    async fn test_father_arms_alarm() {
        let tree = Arc::new(MemoryTree::new());
        let (channel, _) = channel(Arc::clone(&tree), Role::Father);

        channel.set_alarm(true).await.unwrap();
        assert_eq!(tree.read("Alarm/active"), json!(true));
        channel.set_alarm(false).await.unwrap();
        assert_eq!(tree.read("Alarm/active"), json!(false));

        let texts = log_texts(&tree);
        assert!(texts[0].ends_with("Alarm armed"));
        assert!(texts[1].ends_with("Alarm disarmed"));
    }

    #[tokio::test]
    async fn test_toggle_writes_state_and_intensity_together() {
        let tree = Arc::new(MemoryTree::new());
        let (channel, _) = channel(Arc::clone(&tree), Role::Child);

        assert!(channel.toggle_light(2).await.unwrap());
        let writes = tree.writes_under("Leds");
        assert_eq!(writes.len(), 2);
        assert_eq!(tree.read("Leds/2"), json!({"state": true, "pwm": 255}));
        assert!(log_texts(&tree)[0].ends_with("Second bedroom: on"));
    }

    #[tokio::test]
    async fn test_toggle_reads_mirror_not_tree() {
        let tree = Arc::new(MemoryTree::new());
        let (channel, mirror) = channel(Arc::clone(&tree), Role::Child);

        // The tree says on, but the mirror has not seen it yet.
        tree.seed("Leds/0", json!({"state": true, "pwm": 255}));
        assert!(channel.toggle_light(0).await.unwrap());

        mirror.apply(MirrorTarget::Lights, &tree.read("Leds"));
        assert!(!channel.toggle_light(0).await.unwrap());
        assert_eq!(tree.read("Leds/0"), json!({"state": false, "pwm": 0}));
    }

    #[tokio::test]
    async fn test_commands_leave_mirror_untouched() {
        let tree = Arc::new(MemoryTree::deferred());
        let (channel, mirror) = channel(Arc::clone(&tree), Role::Father);

        channel.toggle_light(1).await.unwrap();
        channel.set_light_intensity(3, 90).await.unwrap();
        channel.set_alarm(true).await.unwrap();

        assert_eq!(mirror.version(), 0);
        assert!(!mirror.lights().get(1).unwrap_or_default().is_on);
        assert_eq!(tree.read("Leds"), Value::Null);

        assert_eq!(tree.flush(), 6);
        mirror.apply(MirrorTarget::Lights, &tree.read("Leds"));
        assert!(mirror.lights().get(1).unwrap().is_on);
        assert_eq!(mirror.lights().get(3).unwrap().intensity, 90);
    }

    #[tokio::test]
    async fn test_intensity_writes_pwm_only() {
        let tree = Arc::new(MemoryTree::new());
        let (channel, _) = channel(Arc::clone(&tree), Role::Child);

        channel.set_light_intensity(0, 128).await.unwrap();
        let writes = tree.writes_under("Leds");
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].path, "Leds/0/pwm");
        assert_eq!(writes[0].value, json!(128));
    }

    #[tokio::test]
    async fn test_unknown_light_is_rejected() {
        let tree = Arc::new(MemoryTree::new());
        let (channel, _) = channel(Arc::clone(&tree), Role::Father);

        let err = channel.toggle_light(4).await.unwrap_err();
        assert!(err.is_validation());
        assert!(channel.set_light_intensity(9, 10).await.is_err());
        assert!(tree.writes().is_empty());
    }

    /// Accepts log pushes, rejects every actuator write.
    struct ActuatorsDown {
        inner: MemoryTree,
    }

    #[async_trait]
    impl RealtimeTree for ActuatorsDown {
        fn subscribe(&self, path: &str) -> Subscription {
            self.inner.subscribe(path)
        }

        async fn set(&self, path: &str, value: Value) -> Result<()> {
            if path.starts_with("Eventos") {
                self.inner.set(path, value).await
            } else {
                Err(ShadowError::Tree("permission denied".into()))
            }
        }

        async fn update(&self, _changes: Vec<(String, Value)>) -> Result<()> {
            Err(ShadowError::Tree("permission denied".into()))
        }
    }

    #[tokio::test]
    async fn test_failed_write_is_still_logged() {
        let tree = Arc::new(ActuatorsDown {
            inner: MemoryTree::new(),
        });
        let mirror = StateMirror::new();
        let channel = CommandChannel::new(
            tree.clone(),
            mirror,
            TreeLayout::default(),
            Role::Father,
        );

        assert!(channel.set_curtain(CurtainDirection::Up).await.is_err());
        assert!(channel.toggle_light(0).await.is_err());

        let log = tree.inner.writes_under("Eventos");
        assert_eq!(log.len(), 2);
    }
}
