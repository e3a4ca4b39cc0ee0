// ── Edit sessions ──
//
// A `DeviceDraft` is a detached copy of a device. Field edits and link
// edits land on the draft only; the store sees them after the draft is
// saved and the device list is fetched again.

use serde::Serialize;

use crate::error::CoreError;
use crate::link::{self, LinkRow, LinkValue};
use crate::model::Device;

/// Editable copy of a new or existing device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDraft {
    device: Device,
}

impl DeviceDraft {
    /// Fresh record: default port, no id.
    pub fn new() -> Self {
        Self {
            device: Device::default(),
        }
    }

    /// Detached copy of an existing device.
    pub fn from_device(device: &Device) -> Self {
        Self {
            device: device.clone(),
        }
    }

    /// `true` until the backend has assigned an id.
    pub fn is_new(&self) -> bool {
        self.device.id.is_none()
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut Device {
        &mut self.device
    }

    pub fn into_device(self) -> Device {
        self.device
    }

    // ── Field edits ──────────────────────────────────────────────────

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.device.name = name.into();
        self
    }

    pub fn set_host(&mut self, host: impl Into<String>) -> &mut Self {
        self.device.host = host.into();
        self
    }

    pub fn set_port(&mut self, port: u16) -> &mut Self {
        self.device.port = port;
        self
    }

    /// `None` or an empty string clears the password.
    pub fn set_password(&mut self, password: Option<String>) -> &mut Self {
        self.device.password = password.filter(|p| !p.is_empty());
        self
    }

    /// Same rule the backend enforces, checked before any request.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.device.name.trim().is_empty() || self.device.host.trim().is_empty() {
            return Err(CoreError::ValidationFailed {
                message: "Host and name are required".into(),
            });
        }
        if self.device.port == 0 {
            return Err(CoreError::ValidationFailed {
                message: "Port must be between 1 and 65535".into(),
            });
        }
        Ok(())
    }

    // ── Link edits ───────────────────────────────────────────────────

    /// Open the link editor for one sensor of this draft.
    pub fn edit_links(&self, sensor: &str) -> Option<LinkEditor> {
        let s = self.device.sensor(sensor)?;
        Some(LinkEditor {
            sensor: s.name.clone(),
            rows: link::decode(s),
        })
    }

    /// Write an editor's rows onto this draft's sensor. No network I/O.
    pub fn save_links(&mut self, editor: LinkEditor) -> Result<(), CoreError> {
        let device = self.device.name.clone();
        let sensor = self
            .device
            .sensor_mut(&editor.sensor)
            .ok_or_else(|| CoreError::SensorNotFound {
                device,
                sensor: editor.sensor.clone(),
            })?;
        link::encode(&editor.rows, &mut sensor.links);
        Ok(())
    }
}

impl Default for DeviceDraft {
    fn default() -> Self {
        Self::new()
    }
}

/// Staged link rows for one sensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkEditor {
    sensor: String,
    rows: Vec<LinkRow>,
}

impl LinkEditor {
    pub fn sensor(&self) -> &str {
        &self.sensor
    }

    pub fn rows(&self) -> &[LinkRow] {
        &self.rows
    }

    pub fn row_mut(&mut self, channel: &str) -> Option<&mut LinkRow> {
        self.rows.iter_mut().find(|r| r.name == channel)
    }

    /// Point a channel at a target. Returns `false` for unknown channels.
    pub fn set(&mut self, channel: &str, value: LinkValue) -> bool {
        match self.row_mut(channel) {
            Some(row) => {
                row.set(value);
                true
            }
            None => false,
        }
    }

    /// Unlink a channel. Returns `false` for unknown channels.
    pub fn clear(&mut self, channel: &str) -> bool {
        self.set(channel, LinkValue::Unmapped)
    }

    pub fn clear_all(&mut self) {
        self.rows.iter_mut().for_each(LinkRow::clear);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::model::Sensor;

    fn porch() -> Device {
        let mut sensor = Sensor::named("climate");
        sensor.state.insert("temperature".into(), json!(20));
        sensor.state.insert("humidity".into(), json!(40));
        sensor.links.insert("temperature".into(), "Porch.temp".into());
        Device {
            id: Some(1),
            name: "porch".into(),
            host: "10.0.0.4".into(),
            sensors: vec![sensor],
            ..Device::default()
        }
    }

    #[test]
    fn new_draft_defaults() {
        let draft = DeviceDraft::new();
        assert!(draft.is_new());
        assert_eq!(draft.device().port, 6053);
    }

    #[test]
    fn draft_edits_do_not_touch_source() {
        let source = porch();
        let mut draft = DeviceDraft::from_device(&source);
        draft.set_host("10.0.0.99");

        let mut editor = draft.edit_links("climate").unwrap();
        assert!(editor.set("humidity", LinkValue::mapped("Porch", "hum")));
        draft.save_links(editor).unwrap();

        assert_eq!(source.host, "10.0.0.4");
        assert!(!source.sensors[0].links.contains_key("humidity"));
        assert_eq!(draft.device().sensors[0].links["humidity"], "Porch.hum");
        assert_eq!(draft.device().sensors[0].links["temperature"], "Porch.temp");
    }

    #[test]
    fn clear_unlinks_on_save() {
        let mut draft = DeviceDraft::from_device(&porch());
        let mut editor = draft.edit_links("climate").unwrap();
        assert!(editor.clear("temperature"));
        assert!(!editor.clear("pressure"));
        draft.save_links(editor).unwrap();
        assert_eq!(draft.device().sensors[0].links["temperature"], "");
    }

    #[test]
    fn editor_for_unknown_sensor_is_none() {
        assert!(DeviceDraft::from_device(&porch()).edit_links("nope").is_none());
    }

    #[test]
    fn validation_mirrors_backend_rule() {
        let mut draft = DeviceDraft::new();
        assert!(matches!(draft.validate(), Err(CoreError::ValidationFailed { .. })));
        draft.set_name("garage").set_host("10.0.0.5");
        assert!(draft.validate().is_ok());
        draft.set_port(0);
        assert!(draft.validate().is_err());
    }

    #[test]
    fn empty_password_clears() {
        let mut draft = DeviceDraft::new();
        draft.set_password(Some(String::new()));
        assert!(draft.device().password.is_none());
    }
}
