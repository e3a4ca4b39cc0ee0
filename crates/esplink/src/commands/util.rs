//! Shared helpers for command handlers.

use std::sync::Arc;

use esplink_core::{Controller, Device, DeviceDraft, Sensor};

use crate::error::CliError;

/// Look a device up by name in the current snapshot.
pub fn find_device(controller: &Controller, name: &str) -> Result<Arc<Device>, CliError> {
    controller
        .find_device(name)
        .ok_or_else(|| CliError::device_not_found(name))
}

pub fn find_sensor<'a>(device: &'a Device, name: &str) -> Result<&'a Sensor, CliError> {
    device
        .sensor(name)
        .ok_or_else(|| CliError::sensor_not_found(&device.name, name))
}

/// Detached edit draft for a stored device.
pub fn edit_device(controller: &Controller, name: &str) -> Result<DeviceDraft, CliError> {
    controller
        .edit_device(name)
        .ok_or_else(|| CliError::device_not_found(name))
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Render a possibly-missing field for detail views.
pub fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}
