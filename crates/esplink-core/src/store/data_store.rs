// ── Central reactive data store ──
//
// Holds the device tree for a session. Full refreshes swap the whole tree;
// live updates patch single sensor channels. Mutations are broadcast to
// subscribers via `watch` channels.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::watch;

use super::collection::EntityCollection;
use crate::model::{Device, Sensor};
use crate::stream::EntityStream;

/// Outcome of a single-channel state write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateUpdate {
    /// The channel now holds the new value.
    Applied,
    DeviceNotFound,
    SensorNotFound,
}

impl StateUpdate {
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Reactive store for the device/sensor tree.
///
/// Every mutation is a single copy-on-write step over the published
/// snapshot, so readers never observe a half-applied change.
pub struct DataStore {
    pub(crate) devices: EntityCollection<Device>,
    pub(crate) last_full_refresh: watch::Sender<Option<DateTime<Utc>>>,
    pub(crate) last_push_event: watch::Sender<Option<DateTime<Utc>>>,
}

impl DataStore {
    pub fn new() -> Self {
        let (last_full_refresh, _) = watch::channel(None);
        let (last_push_event, _) = watch::channel(None);

        Self {
            devices: EntityCollection::new(),
            last_full_refresh,
            last_push_event,
        }
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Replace the whole device tree.
    ///
    /// `Arc`s handed out earlier keep pointing at the old tree; callers
    /// must look devices up again by name.
    pub fn replace_all(&self, devices: Vec<Device>) {
        self.devices.replace_all(devices);
        self.last_full_refresh.send_replace(Some(Utc::now()));
    }

    /// Create or overwrite one channel of one sensor.
    ///
    /// Lookups use the first device and first sensor with the given names.
    /// The value is opaque and stored as given.
    pub fn set_sensor_state(
        &self,
        device_name: &str,
        sensor_name: &str,
        channel: &str,
        value: Value,
    ) -> StateUpdate {
        let mut sensor_found = false;
        let outcome = self.devices.modify_first(
            |d| d.name == device_name,
            |device| {
                let Some(sensor) = device.sensor_mut(sensor_name) else {
                    return false;
                };
                sensor_found = true;
                if sensor.state.get(channel) == Some(&value) {
                    return false;
                }
                sensor.state.insert(channel.to_owned(), value);
                true
            },
        );

        match outcome {
            None => StateUpdate::DeviceNotFound,
            Some(_) if sensor_found => StateUpdate::Applied,
            Some(_) => StateUpdate::SensorNotFound,
        }
    }

    pub(crate) fn mark_push_event(&self) {
        self.last_push_event.send_replace(Some(Utc::now()));
    }

    // ── Lookups ──────────────────────────────────────────────────────

    /// First device with this name.
    pub fn find_device_by_name(&self, name: &str) -> Option<Arc<Device>> {
        self.devices.find(|d| d.name == name)
    }

    /// First sensor with this name on `device`.
    pub fn find_sensor_by_name<'a>(device: &'a Device, name: &str) -> Option<&'a Sensor> {
        device.sensor(name)
    }

    pub fn device_by_id(&self, id: i64) -> Option<Arc<Device>> {
        self.devices.find(|d| d.id == Some(id))
    }

    pub fn devices_snapshot(&self) -> Arc<Vec<Arc<Device>>> {
        self.devices.snapshot()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_devices(&self) -> EntityStream<Device> {
        EntityStream::new(self.devices.subscribe())
    }

    // ── Metadata ─────────────────────────────────────────────────────

    pub fn last_full_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_full_refresh.borrow()
    }

    pub fn last_push_event(&self) -> Option<DateTime<Utc>> {
        *self.last_push_event.borrow()
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}
