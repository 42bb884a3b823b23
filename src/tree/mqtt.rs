//! Realtime tree carried over MQTT retained topics.
//!
//! Path `a/b` maps to topic `{prefix}/a/b` with a JSON payload. The client
//! subscribes to everything under the prefix and keeps a local replica that only changes
//! when the broker delivers a message, including the echo of our own
//! publishes. A write is therefore never visible locally before the broker
//! has accepted it.

use super::client::{MqttClient, MqttMessage};
use super::replica::Replica;
use super::{RealtimeTree, Subscription, join, push_key};
use crate::config::MqttConfig;
use crate::error::{Result, ShadowError};
use async_trait::async_trait;
use log::{debug, info, warn};
use rumqttc::{AsyncClient, QoS};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

pub struct MqttTree {
    replica: Arc<Replica>,
    client: AsyncClient,
    prefix: String,
    event_loop: JoinHandle<()>,
    router: JoinHandle<()>,
}

impl MqttTree {
    /// Connect to the broker and start mirroring every topic under `prefix`.
    pub async fn connect(config: &MqttConfig, prefix: &str) -> Result<Self> {
        let prefix = prefix.trim_matches('/').to_string();
        info!(
            "[MQTT] Connecting to {}:{} (prefix '{}')",
            config.broker_host, config.broker_port, prefix
        );

        let mqtt_client = MqttClient::new(config);
        let client = mqtt_client.client();

        // Channel for MQTT messages
        let (msg_tx, mut msg_rx) = mpsc::channel::<MqttMessage>(64);

        // Channel to signal when connected
        let (connected_tx, connected_rx) = oneshot::channel();

        // Start MQTT event loop FIRST (so it can establish connection)
        let event_loop = tokio::spawn(async move {
            mqtt_client.run(msg_tx, Some(connected_tx)).await;
        });

        match tokio::time::timeout(Duration::from_secs(10), connected_rx).await {
            Ok(Ok(())) => {
                info!("[MQTT] Connection established, subscribing to tree");
            }
            Ok(Err(_)) => {
                event_loop.abort();
                return Err(ShadowError::MqttConnectionFailed(
                    "connection signal channel dropped".into(),
                ));
            }
            Err(_) => {
                event_loop.abort();
                return Err(ShadowError::MqttConnectionFailed(
                    "connection timeout after 10 seconds".into(),
                ));
            }
        }

        client
            .subscribe(subscription_filter(&prefix), QoS::AtLeastOnce)
            .await?;

        let replica = Replica::new();
        let router_replica = replica.clone();
        let router_prefix = prefix.clone();
        let router = tokio::spawn(async move {
            while let Some(msg) = msg_rx.recv().await {
                apply_message(&router_replica, &router_prefix, &msg);
            }
        });

        Ok(Self {
            replica,
            client,
            prefix,
            event_loop,
            router,
        })
    }

    fn topic(&self, path: &str) -> String {
        join(&self.prefix, path)
    }

    async fn publish(&self, path: &str, value: &Value) -> Result<()> {
        let topic = self.topic(path);
        // Empty retained payload clears the topic
        let payload = if value.is_null() {
            String::new()
        } else {
            serde_json::to_string(value)?
        };
        debug!("[MQTT] {} <- {}", topic, payload);
        self.client
            .publish(topic, QoS::AtLeastOnce, true, payload.into_bytes())
            .await?;
        Ok(())
    }

    pub async fn disconnect(&self) {
        if let Err(e) = self.client.disconnect().await {
            warn!("[MQTT] Disconnect failed: {}", e);
        }
    }
}

impl Drop for MqttTree {
    fn drop(&mut self) {
        self.router.abort();
        self.event_loop.abort();
    }
}

#[async_trait]
impl RealtimeTree for MqttTree {
    fn subscribe(&self, path: &str) -> Subscription {
        self.replica.register(path)
    }

    async fn set(&self, path: &str, value: Value) -> Result<()> {
        self.publish(path, &value).await
    }

    async fn update(&self, changes: Vec<(String, Value)>) -> Result<()> {
        for (path, value) in &changes {
            self.publish(path, value).await?;
        }
        Ok(())
    }

    async fn push(&self, path: &str, value: Value) -> Result<String> {
        let key = push_key();
        self.publish(&join(path, &key), &value).await?;
        Ok(key)
    }
}

/// Topic filter covering the whole tree. An empty prefix means the tree
/// sits at the broker root, where `/#` would only match topics with an
/// empty first level.
fn subscription_filter(prefix: &str) -> String {
    if prefix.is_empty() {
        "#".to_string()
    } else {
        format!("{prefix}/#")
    }
}

/// Translate a topic under `prefix` into a tree path.
fn topic_path<'a>(prefix: &str, topic: &'a str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(topic);
    }
    if topic == prefix {
        return Some("");
    }
    topic.strip_prefix(prefix)?.strip_prefix('/')
}

/// Decode a payload: empty deletes, JSON is parsed, anything else is a string.
fn decode_payload(payload: &str) -> Value {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(payload.to_string()))
}

fn apply_message(replica: &Replica, prefix: &str, msg: &MqttMessage) {
    match topic_path(prefix, &msg.topic) {
        Some(path) => replica.apply(&[(path.to_string(), decode_payload(&msg.payload))]),
        None => debug!("[MQTT] Ignoring message outside tree: {}", msg.topic),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_topic_path() {
        assert_eq!(topic_path("home", "home/Leds/0/pwm"), Some("Leds/0/pwm"));
        assert_eq!(topic_path("home", "home"), Some(""));
        assert_eq!(topic_path("home", "homer/Leds"), None);
        assert_eq!(topic_path("home", "other/Leds"), None);
    }

    #[test]
    fn test_subscription_filter() {
        assert_eq!(subscription_filter("home"), "home/#");
        assert_eq!(subscription_filter("house/main"), "house/main/#");
        assert_eq!(subscription_filter(""), "#");
    }

    #[test]
    fn test_root_tree_receives_top_level_topics() {
        let replica = Replica::new();
        let msg = MqttMessage {
            topic: "Sensores/temperatura".into(),
            payload: "22.5".into(),
        };
        apply_message(&replica, "", &msg);
        assert_eq!(replica.read("Sensores/temperatura"), json!(22.5));
    }

    #[test]
    fn test_decode_payload() {
        assert_eq!(decode_payload("21.5"), json!(21.5));
        assert_eq!(decode_payload("true"), json!(true));
        assert_eq!(decode_payload("\"up\""), json!("up"));
        assert_eq!(decode_payload("oscuro"), json!("oscuro"));
        assert_eq!(decode_payload(""), Value::Null);
    }

    #[test]
    fn test_apply_message_updates_replica() {
        let replica = Replica::new();
        let msg = MqttMessage {
            topic: "home/Sensores/humedad".into(),
            payload: "55".into(),
        };
        apply_message(&replica, "home", &msg);
        assert_eq!(replica.read("Sensores/humedad"), json!(55));

        let clear = MqttMessage {
            topic: "home/Sensores/humedad".into(),
            payload: String::new(),
        };
        apply_message(&replica, "home", &clear);
        assert_eq!(replica.read("Sensores/humedad"), Value::Null);
    }
}
