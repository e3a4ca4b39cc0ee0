// ── Live update reconciler ──
//
// Applies push-feed sensor updates to the store. One task drains the
// bounded event queue, so events are applied strictly in arrival order
// and never interleave with each other.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use esplink_api::PushMessage;

use crate::store::{DataStore, StateUpdate};

/// Operation tag of the frames this module handles.
pub const SENSOR_UPDATE_OPERATION: &str = "sensor_update";

/// Payload of a `sensor_update` frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SensorUpdate {
    pub device: String,
    pub sensor: String,
    #[serde(deserialize_with = "channel_key")]
    pub key: String,
    #[serde(default)]
    pub state: Value,
}

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    Applied,
    /// Not a `sensor_update`; left for other consumers.
    Ignored,
    /// Payload did not decode.
    Malformed,
    DeviceNotFound,
    SensorNotFound,
}

/// Handle one push message against the store. Never fails.
pub fn apply(store: &DataStore, msg: &PushMessage) -> Reconciled {
    if msg.operation != SENSOR_UPDATE_OPERATION {
        trace!(operation = %msg.operation, "ignoring push operation");
        return Reconciled::Ignored;
    }

    let update = match SensorUpdate::deserialize(&msg.data) {
        Ok(u) => u,
        Err(e) => {
            warn!(error = %e, "dropping malformed sensor update");
            return Reconciled::Malformed;
        }
    };

    apply_update(store, update)
}

/// Apply a decoded update. Misses are logged and dropped.
pub fn apply_update(store: &DataStore, update: SensorUpdate) -> Reconciled {
    match store.set_sensor_state(&update.device, &update.sensor, &update.key, update.state) {
        StateUpdate::Applied => {
            store.mark_push_event();
            trace!(device = %update.device, sensor = %update.sensor, key = %update.key, "sensor state updated");
            Reconciled::Applied
        }
        StateUpdate::DeviceNotFound => {
            debug!(device = %update.device, "sensor update for unknown device");
            Reconciled::DeviceNotFound
        }
        StateUpdate::SensorNotFound => {
            debug!(device = %update.device, sensor = %update.sensor, "sensor update for unknown sensor");
            Reconciled::SensorNotFound
        }
    }
}

/// Drain the push queue until cancelled or every sender is gone.
pub async fn reconcile_task(
    store: Arc<DataStore>,
    mut rx: mpsc::Receiver<PushMessage>,
    cancel: CancellationToken,
) {
    debug!("reconcile task started");
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            msg = rx.recv() => {
                let Some(msg) = msg else { break };
                apply(&store, &msg);
            }
        }
    }
    debug!("reconcile task exiting");
}

/// Channel keys arrive as strings or as entity keys (numbers).
fn channel_key<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number key, got {other}"
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::model::{Device, Sensor};

    fn seeded_store() -> DataStore {
        let mut sensor = Sensor::named("S");
        sensor.state.insert("temp".into(), json!(20));
        let store = DataStore::new();
        store.replace_all(vec![Device {
            name: "D".into(),
            sensors: vec![sensor],
            ..Device::default()
        }]);
        store
    }

    fn update(data: Value) -> PushMessage {
        PushMessage {
            operation: SENSOR_UPDATE_OPERATION.into(),
            data,
        }
    }

    #[test]
    fn overwrites_existing_channel() {
        let store = seeded_store();
        let out = apply(&store, &update(json!({"device": "D", "sensor": "S", "key": "temp", "state": 25})));
        assert_eq!(out, Reconciled::Applied);
        let dev = store.find_device_by_name("D").unwrap();
        assert_eq!(dev.sensors[0].state["temp"], json!(25));
        assert!(store.last_push_event().is_some());
    }

    #[test]
    fn unknown_device_leaves_store_unchanged() {
        let store = seeded_store();
        let before = store.devices_snapshot();
        let out = apply(&store, &update(json!({"device": "X", "sensor": "S", "key": "temp", "state": 1})));
        assert_eq!(out, Reconciled::DeviceNotFound);
        assert_eq!(store.devices_snapshot(), before);
        assert!(store.last_push_event().is_none());
    }

    #[test]
    fn unknown_sensor_leaves_store_unchanged() {
        let store = seeded_store();
        let before = store.devices_snapshot();
        let out = apply(&store, &update(json!({"device": "D", "sensor": "X", "key": "temp", "state": 1})));
        assert_eq!(out, Reconciled::SensorNotFound);
        assert_eq!(store.devices_snapshot(), before);
        assert!(store.last_push_event().is_none());
    }

    #[test]
    fn other_operations_are_ignored() {
        let store = seeded_store();
        let before = store.devices_snapshot();
        let msg = PushMessage {
            operation: "device_online".into(),
            data: json!({"device": "D", "sensor": "S", "key": "temp", "state": 99}),
        };
        assert_eq!(apply(&store, &msg), Reconciled::Ignored);
        assert_eq!(store.devices_snapshot(), before);
        assert!(store.last_push_event().is_none());
    }

    #[test]
    fn malformed_payload_is_dropped() {
        let store = seeded_store();
        assert_eq!(apply(&store, &update(json!({"device": "D"}))), Reconciled::Malformed);
        assert_eq!(apply(&store, &update(json!("garbage"))), Reconciled::Malformed);
        assert_eq!(
            apply(&store, &update(json!({"device": "D", "sensor": "S", "key": [1], "state": 1}))),
            Reconciled::Malformed
        );
    }

    #[test]
    fn numeric_key_is_normalised() {
        let store = seeded_store();
        apply(&store, &update(json!({"device": "D", "sensor": "S", "key": 42, "state": true})));
        let dev = store.find_device_by_name("D").unwrap();
        assert_eq!(dev.sensors[0].state["42"], json!(true));
    }

    #[test]
    fn duplicate_events_are_harmless() {
        let store = seeded_store();
        let msg = update(json!({"device": "D", "sensor": "S", "key": "temp", "state": 30}));
        apply(&store, &msg);
        apply(&store, &msg);
        let dev = store.find_device_by_name("D").unwrap();
        assert_eq!(dev.sensors[0].state["temp"], json!(30));
        assert_eq!(dev.sensors[0].state.len(), 1);
    }

    #[tokio::test]
    async fn task_applies_in_arrival_order() {
        let store = Arc::new(seeded_store());
        let (tx, rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(reconcile_task(Arc::clone(&store), rx, cancel.clone()));

        for value in [21, 22, 23] {
            tx.send(update(json!({"device": "D", "sensor": "S", "key": "temp", "state": value})))
                .await
                .unwrap();
        }
        drop(tx);
        task.await.unwrap();

        let dev = store.find_device_by_name("D").unwrap();
        assert_eq!(dev.sensors[0].state["temp"], json!(23));
    }

    #[tokio::test]
    async fn task_stops_on_cancel() {
        let store = Arc::new(seeded_store());
        let (_tx, rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(reconcile_task(store, rx, cancel.clone()));
        cancel.cancel();
        task.await.unwrap();
    }
}
