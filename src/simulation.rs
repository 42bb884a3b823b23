//! Sensor simulation for demos.
//!
//! Plays the part of the house firmware: writes plausible sensor readings
//! into the tree so the mirror has something to show without hardware.

use crate::tree::{RealtimeTree, TreeLayout};
use log::{info, warn};
use rand::Rng;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, interval};

/// One round of fake readings as `(path, value)` pairs.
pub fn simulated_readings(layout: &TreeLayout, rng: &mut impl Rng) -> Vec<(String, Value)> {
    let temperature = (rng.gen_range(18.0..28.0_f64) * 10.0).round() / 10.0;
    let humidity = rng.gen_range(30..70);
    let motion = u8::from(rng.gen_bool(0.2));
    let ambient = if rng.gen_bool(0.5) { "oscuro" } else { "claro" };

    vec![
        (layout.temperature.clone(), json!(temperature)),
        (layout.humidity.clone(), json!(humidity)),
        (layout.motion.clone(), json!(motion)),
        (layout.ambient.clone(), json!(ambient)),
    ]
}

/// Spawn a task that writes new readings every `period`.
///
/// Abort the returned handle to stop it. Write failures are logged and the
/// next round is attempted as usual.
pub fn run_sensor_simulation(
    tree: Arc<dyn RealtimeTree>,
    layout: TreeLayout,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = interval(period);
        loop {
            interval.tick().await;
            let readings = simulated_readings(&layout, &mut rand::thread_rng());
            let summary = readings
                .iter()
                .map(|(path, value)| format!("{path}={value}"))
                .collect::<Vec<_>>()
                .join(" ");

            match tree.update(readings).await {
                Ok(()) => info!("[Sim] {}", summary),
                Err(e) => warn!("[Sim] Could not publish readings: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::MemoryTree;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_readings_are_in_range() {
        let layout = TreeLayout::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let readings = simulated_readings(&layout, &mut rng);
            assert_eq!(readings.len(), 4);

            let temperature = readings[0].1.as_f64().unwrap();
            assert!((18.0..=28.0).contains(&temperature));
            let humidity = readings[1].1.as_i64().unwrap();
            assert!((30..70).contains(&humidity));
            assert!(matches!(readings[2].1.as_u64(), Some(0 | 1)));
        }
    }

    #[tokio::test]
    async fn test_simulation_writes_tree() {
        let tree = Arc::new(MemoryTree::new());
        let layout = TreeLayout::default();
        let handle = run_sensor_simulation(tree.clone(), layout.clone(), Duration::from_millis(10));

        tokio::time::timeout(Duration::from_secs(1), async {
            while tree.read(&layout.temperature).is_null() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("simulation should publish");

        handle.abort();
        assert!(tree.read(&layout.humidity).is_number());
    }
}
