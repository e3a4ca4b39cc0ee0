// ── Sensor domain type ──

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use strum::EnumString;

/// Entity type reported by the device.
#[derive(Debug, Clone, PartialEq, Eq, Default, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EntityKind {
    #[default]
    Sensor,
    BinarySensor,
    Switch,
    Light,
    Number,
    Text,
    Cover,
    #[strum(default)]
    Other(String),
}

impl EntityKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Sensor => "sensor",
            Self::BinarySensor => "binary_sensor",
            Self::Switch => "switch",
            Self::Light => "light",
            Self::Number => "number",
            Self::Text => "text",
            Self::Cover => "cover",
            Self::Other(s) => s,
        }
    }

    /// Parse a wire value; absent or empty means a plain sensor.
    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::Sensor,
            Some(s) => Self::from_str(s).unwrap_or_else(|_| Self::Other(s.to_owned())),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EntityKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One sensor entity of a device.
///
/// `state` maps channel keys to their latest values in the order the
/// backend reported them. `links` maps channel keys to `"object.property"`
/// strings; an empty string means unlinked.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Sensor {
    pub id: Option<i64>,
    pub name: String,
    pub kind: EntityKind,
    pub device_class: Option<String>,
    pub unit: Option<String>,
    pub icon: Option<String>,
    pub key: Option<String>,
    pub accuracy_decimals: Option<u8>,
    pub state: IndexMap<String, Value>,
    pub links: IndexMap<String, String>,
}

impl Sensor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Render a channel value, rounding numbers to `accuracy_decimals`.
    pub fn format_state(&self, channel: &str) -> Option<String> {
        self.state.get(channel).map(|v| self.format_value(v))
    }

    pub fn format_value(&self, value: &Value) -> String {
        let mut out = match (value, self.accuracy_decimals) {
            (Value::Number(n), Some(decimals)) if !n.is_i64() && !n.is_u64() => match n.as_f64() {
                Some(f) => format!("{f:.prec$}", prec = usize::from(decimals)),
                None => n.to_string(),
            },
            (Value::String(s), _) => s.clone(),
            (Value::Null, _) => String::from("-"),
            (other, _) => other.to_string(),
        };
        if let Some(unit) = self.unit.as_deref().filter(|u| !u.is_empty()) {
            out.push(' ');
            out.push_str(unit);
        }
        out
    }
}
