// ── Reactive entity streams ──
//
// Subscription types for consuming store changes.

use std::sync::Arc;

use tokio::sync::watch;

/// A subscription to a collection of entities.
///
/// Gives point-in-time snapshot access and change notification via
/// [`changed`](Self::changed).
pub struct EntityStream<T: Clone + Send + Sync + 'static> {
    current: Arc<Vec<Arc<T>>>,
    receiver: watch::Receiver<Arc<Vec<Arc<T>>>>,
}

impl<T: Clone + Send + Sync + 'static> EntityStream<T> {
    pub(crate) fn new(receiver: watch::Receiver<Arc<Vec<Arc<T>>>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Snapshot as of creation or the last [`changed`](Self::changed).
    pub fn current(&self) -> &Arc<Vec<Arc<T>>> {
        &self.current
    }

    /// Latest snapshot (may have changed since the last `changed()`).
    pub fn latest(&self) -> Arc<Vec<Arc<T>>> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<Vec<Arc<T>>>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&snap);
        Some(snap)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use crate::model::{Device, Sensor};
    use crate::store::DataStore;

    #[tokio::test]
    async fn changed_yields_after_state_write() {
        let store = DataStore::new();
        let mut sensor = Sensor::named("S");
        sensor.state.insert("temp".into(), json!(1));
        store.replace_all(vec![Device {
            name: "D".into(),
            sensors: vec![sensor],
            ..Device::default()
        }]);

        let mut stream = store.subscribe_devices();
        assert_eq!(stream.current().len(), 1);

        store.set_sensor_state("D", "S", "temp", json!(2));
        let snap = stream.changed().await.unwrap();
        assert_eq!(snap[0].sensors[0].state["temp"], json!(2));
        assert_eq!(stream.latest()[0].sensors[0].state["temp"], json!(2));
    }
}
