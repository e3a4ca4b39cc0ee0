// Wire models for the device-panel backend
//
// These mirror the JSON the backend emits. Fields are lenient: anything
// the backend may omit has a serde default, so older plugin versions
// still decode.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Native API port devices listen on unless told otherwise.
pub const DEFAULT_DEVICE_PORT: u16 = 6053;

fn default_port() -> u16 {
    DEFAULT_DEVICE_PORT
}

/// A device as returned by `GET devices` and sent to `POST device`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Absent for a device that has not been created yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    // Read-only status reported by the backend.
    #[serde(default, skip_serializing)]
    pub connected: bool,
    #[serde(default, skip_serializing)]
    pub last_seen: Option<String>,
    #[serde(default, skip_serializing)]
    pub firmware_version: Option<String>,

    #[serde(default)]
    pub sensors: Vec<SensorRecord>,
}

/// One sensor entity of a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    /// Entity type (`sensor`, `binary_sensor`, `switch`, ...).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "class", default, skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,
    /// Either a channel map or a bare scalar from older backends.
    #[serde(default)]
    pub state: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Entity key on the device; some backends send it as a number.
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy_decimals: Option<u8>,
    #[serde(default, deserialize_with = "lenient_links")]
    pub links: IndexMap<String, String>,
}

/// One linkable external object from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub id: String,
    #[serde(default)]
    pub description: String,
    /// Property names, when the backend reports them.
    #[serde(default)]
    pub properties: Vec<String>,
}

/// Generic `{status, message}` reply of mutating endpoints.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StatusResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

impl StatusResponse {
    /// Succeeds on `{"status":"success"}` or `{"success":true}`.
    pub(crate) fn into_result(self) -> Result<(), crate::error::Error> {
        let ok = match (self.status.as_deref(), self.success) {
            (Some(status), _) => status.eq_ignore_ascii_case("success"),
            (None, Some(success)) => success,
            (None, None) => true,
        };
        if ok {
            Ok(())
        } else {
            Err(crate::error::Error::Rejected {
                message: self
                    .message
                    .unwrap_or_else(|| "request failed without a message".into()),
            })
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// `null` link values mean "unlinked" and become empty strings.
fn lenient_links<'de, D>(deserializer: D) -> Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<IndexMap<String, Option<String>>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, v.unwrap_or_default()))
        .collect())
}
