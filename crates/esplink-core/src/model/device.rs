// ── Device domain type ──

use chrono::NaiveDateTime;
use serde::Serialize;

use super::sensor::Sensor;

/// Native API port devices listen on unless told otherwise.
pub const DEFAULT_PORT: u16 = esplink_api::models::DEFAULT_DEVICE_PORT;

/// A managed device and its sensors.
///
/// `name` is the lookup key for live updates, `id` the key for
/// update and delete. `id` is `None` until the backend creates the device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    pub id: Option<i64>,
    pub name: String,
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub connected: bool,
    pub last_seen: Option<NaiveDateTime>,
    pub firmware_version: Option<String>,
    pub sensors: Vec<Sensor>,
}

impl Default for Device {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            host: String::new(),
            port: DEFAULT_PORT,
            password: None,
            connected: false,
            last_seen: None,
            firmware_version: None,
            sensors: Vec::new(),
        }
    }
}

impl Device {
    /// First sensor with this name.
    pub fn sensor(&self, name: &str) -> Option<&Sensor> {
        self.sensors.iter().find(|s| s.name == name)
    }

    pub fn sensor_mut(&mut self, name: &str) -> Option<&mut Sensor> {
        self.sensors.iter_mut().find(|s| s.name == name)
    }

    /// `host:port` for display.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Number of channels with a non-empty link across all sensors.
    pub fn linked_channel_count(&self) -> usize {
        self.sensors
            .iter()
            .flat_map(|s| s.links.values())
            .filter(|l| !l.is_empty())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_device_uses_default_port() {
        let dev = Device::default();
        assert_eq!(dev.port, 6053);
        assert!(dev.id.is_none());
    }

    #[test]
    fn sensor_lookup_returns_first_match() {
        let mut first = Sensor::named("climate");
        first.unit = Some("°C".into());
        let second = Sensor::named("climate");
        let dev = Device {
            sensors: vec![first, second],
            ..Device::default()
        };
        assert_eq!(
            dev.sensor("climate").and_then(|s| s.unit.as_deref()),
            Some("°C")
        );
        assert!(dev.sensor("missing").is_none());
    }
}
