//! Device shadow of the house.
//!
//! - [`StateMirror`]: sensors, lights and event log mirrored from the tree
//! - [`CommandChannel`]: curtain, alarm and light commands
//! - [`EventLog`]: timestamped entries appended to the shared log
//! - [`AccessGate`]: PIN submissions and the entry history
//!
//! [`HomeShadow`] wires the four together for one signed-in member.

pub mod access_gate;
pub mod commands;
pub mod event_log;
pub mod lights;
pub mod mirror;

pub use access_gate::{AccessAttempt, AccessGate, AccessOutcome};
pub use commands::{CommandChannel, CurtainDirection};
pub use event_log::{EventLog, LOG_CAPACITY, LogEntry, LogView, format_entry};
pub use lights::{ActuatorState, FULL_INTENSITY, LIGHT_COUNT, LightBank, light_label};
pub use mirror::{MirrorTarget, MirrorTask, ReadingValue, SensorName, SensorReading, StateMirror};

use crate::config::AccessConfig;
use crate::role::Role;
use crate::services::{BlobStore, DocumentStore};
use crate::tree::{RealtimeTree, TreeLayout};
use std::sync::Arc;

/// Shadow session: an attached mirror plus the command and access paths
/// acting on behalf of one member.
pub struct HomeShadow {
    pub mirror: Arc<StateMirror>,
    pub commands: CommandChannel,
    pub access: AccessGate,
    task: MirrorTask,
}

impl HomeShadow {
    pub fn attach(
        tree: Arc<dyn RealtimeTree>,
        documents: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        layout: TreeLayout,
        access: AccessConfig,
        role: Role,
        actor_label: impl Into<String>,
    ) -> Self {
        let mirror = StateMirror::new();
        let task = mirror.attach(tree.as_ref(), &layout);
        let access = AccessGate::new(
            Arc::clone(&tree),
            documents,
            blobs,
            &layout,
            access,
            actor_label,
        );
        let commands = CommandChannel::new(tree, Arc::clone(&mirror), layout, role);

        Self {
            mirror,
            commands,
            access,
            task,
        }
    }

    /// Stop mirroring. No tree value is applied after this returns.
    pub async fn close(self) {
        self.task.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::services::{MemoryBlobs, MemoryDocuments};
    use crate::tree::MemoryTree;
    use std::time::Duration;

    #[tokio::test]
    async fn test_command_round_trip_through_tree() {
        let tree = Arc::new(MemoryTree::deferred());
        let shadow = HomeShadow::attach(
            tree.clone(),
            Arc::new(MemoryDocuments::new()),
            Arc::new(MemoryBlobs::new()),
            TreeLayout::default(),
            Config::default().access,
            Role::Father,
            "Luis",
        );

        shadow.commands.toggle_light(0).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!shadow.mirror.lights().get(0).unwrap().is_on);
        assert!(shadow.mirror.log().is_empty());

        tree.flush();
        tokio::time::timeout(Duration::from_secs(1), async {
            while !shadow.mirror.lights().get(0).unwrap().is_on || shadow.mirror.log().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("mirror should pick up flushed writes");

        assert!(shadow.mirror.log().texts()[0].ends_with("Bathroom: on"));
        shadow.close().await;
        assert_eq!(tree.listener_count(), 0);
    }
}
