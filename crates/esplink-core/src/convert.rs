// ── API-to-domain type conversions ──
//
// Bridges raw `esplink_api` wire records into `esplink_core::model`
// domain types and back. Each `From` impl normalizes field shapes and
// fills defaults for missing optional data.

use chrono::{DateTime, NaiveDateTime};
use indexmap::IndexMap;
use serde_json::Value;

use esplink_api::models::{DeviceRecord, ObjectRecord, SensorRecord};

use crate::model::{CatalogEntry, Device, EntityKind, Sensor};

/// Channel key used for a bare scalar state when the sensor has no key.
const SCALAR_CHANNEL: &str = "state";

// ── Helpers ────────────────────────────────────────────────────────

/// Parse a backend timestamp: naive ISO-8601 first, then RFC 3339.
fn parse_timestamp(raw: Option<&str>) -> Option<NaiveDateTime> {
    let raw = raw?.trim();
    raw.parse::<NaiveDateTime>()
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_utc()))
}

/// Normalize a wire state into an ordered channel map.
///
/// Objects keep their entries, `null` is empty, and any other scalar is
/// filed under the sensor key.
fn state_channels(state: Value, key: Option<&str>) -> IndexMap<String, Value> {
    match state {
        Value::Object(map) => map.into_iter().collect(),
        Value::Null => IndexMap::new(),
        scalar => {
            let channel = key.filter(|k| !k.is_empty()).unwrap_or(SCALAR_CHANNEL);
            IndexMap::from([(channel.to_owned(), scalar)])
        }
    }
}

// ── Wire → domain ──────────────────────────────────────────────────

impl From<SensorRecord> for Sensor {
    fn from(r: SensorRecord) -> Self {
        let state = state_channels(r.state, r.key.as_deref());
        Self {
            id: r.id,
            kind: EntityKind::from_wire(r.kind.as_deref()),
            name: r.name,
            device_class: r.device_class.filter(|c| !c.is_empty()),
            unit: r.unit.filter(|u| !u.is_empty()),
            icon: r.icon.filter(|i| !i.is_empty()),
            key: r.key,
            accuracy_decimals: r.accuracy_decimals,
            state,
            links: r.links,
        }
    }
}

impl From<DeviceRecord> for Device {
    fn from(r: DeviceRecord) -> Self {
        Self {
            id: r.id,
            name: r.name,
            host: r.host,
            port: r.port,
            password: r.password.filter(|p| !p.is_empty()),
            connected: r.connected,
            last_seen: parse_timestamp(r.last_seen.as_deref()),
            firmware_version: r.firmware_version.filter(|v| !v.is_empty()),
            sensors: r.sensors.into_iter().map(Sensor::from).collect(),
        }
    }
}

impl From<ObjectRecord> for CatalogEntry {
    fn from(r: ObjectRecord) -> Self {
        Self {
            id: r.id,
            description: r.description,
            properties: r.properties,
        }
    }
}

// ── Domain → wire (save payloads) ──────────────────────────────────

impl From<&Sensor> for SensorRecord {
    fn from(s: &Sensor) -> Self {
        Self {
            id: s.id,
            name: s.name.clone(),
            kind: Some(s.kind.to_string()),
            device_class: s.device_class.clone(),
            state: Value::Object(s.state.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
            unit: s.unit.clone(),
            icon: s.icon.clone(),
            key: s.key.clone(),
            accuracy_decimals: s.accuracy_decimals,
            links: s.links.clone(),
        }
    }
}

impl From<&Device> for DeviceRecord {
    fn from(d: &Device) -> Self {
        Self {
            id: d.id,
            name: d.name.clone(),
            host: d.host.clone(),
            port: d.port,
            password: d.password.clone(),
            connected: d.connected,
            last_seen: None,
            firmware_version: d.firmware_version.clone(),
            sensors: d.sensors.iter().map(SensorRecord::from).collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sensor_record(value: Value) -> SensorRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn object_state_keeps_channel_order() {
        let s = Sensor::from(sensor_record(json!({
            "name": "climate",
            "state": {"temperature": 21.5, "humidity": 40, "pressure": 1012}
        })));
        let keys: Vec<_> = s.state.keys().map(String::as_str).collect();
        assert_eq!(keys, ["temperature", "humidity", "pressure"]);
    }

    #[test]
    fn scalar_state_is_filed_under_key() {
        let s = Sensor::from(sensor_record(json!({
            "name": "relay", "key": 99, "state": true
        })));
        assert_eq!(s.state.get("99"), Some(&json!(true)));

        let s = Sensor::from(sensor_record(json!({"name": "relay", "state": "ON"})));
        assert_eq!(s.state.get("state"), Some(&json!("ON")));
    }

    #[test]
    fn null_state_is_empty() {
        let s = Sensor::from(sensor_record(json!({"name": "idle", "state": null})));
        assert!(s.state.is_empty());
    }

    #[test]
    fn last_seen_accepts_naive_and_rfc3339() {
        assert!(parse_timestamp(Some("2024-05-01T10:20:30.123456")).is_some());
        assert!(parse_timestamp(Some("2024-05-01T10:20:30Z")).is_some());
        assert!(parse_timestamp(Some("yesterday")).is_none());
        assert!(parse_timestamp(None).is_none());
    }

    #[test]
    fn device_round_trips_links_into_save_payload() {
        let record: DeviceRecord = serde_json::from_value(json!({
            "id": 4,
            "name": "porch",
            "host": "10.0.0.4",
            "sensors": [{
                "id": 40,
                "name": "climate",
                "state": {"temperature": 20},
                "links": {"temperature": "Porch.temp"}
            }]
        }))
        .unwrap();
        let device = Device::from(record);
        let payload = DeviceRecord::from(&device);
        assert_eq!(payload.sensors[0].id, Some(40));
        assert_eq!(payload.sensors[0].links["temperature"], "Porch.temp");
        assert_eq!(payload.port, 6053);
    }
}
