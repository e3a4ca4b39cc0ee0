//! Live sensor watch: prints each reconciled state change until Ctrl-C.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::Value;

use esplink_core::{Controller, Device};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

/// One channel whose value differs between two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
struct SensorChange {
    at: DateTime<Local>,
    device: String,
    sensor: String,
    channel: String,
    value: Value,
    #[serde(skip)]
    display: String,
}

impl SensorChange {
    fn line(&self) -> String {
        format!(
            "{} {}/{}/{} = {}",
            self.at.format("%H:%M:%S"),
            self.device,
            self.sensor,
            self.channel,
            self.display
        )
    }
}

/// Channels in `current` whose value is new or changed relative to `previous`.
fn diff(
    previous: &[Arc<Device>],
    current: &[Arc<Device>],
    only: Option<&str>,
    at: DateTime<Local>,
) -> Vec<SensorChange> {
    let before: HashMap<&str, &Arc<Device>> = previous.iter().map(|d| (d.name.as_str(), d)).collect();
    let mut changes = Vec::new();

    for device in current {
        if only.is_some_and(|name| name != device.name) {
            continue;
        }
        let old = before.get(device.name.as_str());
        if old.is_some_and(|old| Arc::ptr_eq(old, device)) {
            continue;
        }
        for sensor in &device.sensors {
            let old_sensor = old.and_then(|d| d.sensor(&sensor.name));
            for (channel, value) in &sensor.state {
                if old_sensor.and_then(|s| s.state.get(channel)) == Some(value) {
                    continue;
                }
                changes.push(SensorChange {
                    at,
                    device: device.name.clone(),
                    sensor: sensor.name.clone(),
                    channel: channel.clone(),
                    value: value.clone(),
                    display: sensor.format_value(value),
                });
            }
        }
    }
    changes
}

fn render(change: &SensorChange, format: &OutputFormat) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Table | OutputFormat::Plain => change.line(),
        // One object per line so the stream stays parseable.
        OutputFormat::Json | OutputFormat::JsonCompact => serde_json::to_string(change)?,
        OutputFormat::Yaml => format!("---\n{}", serde_yaml::to_string(change)?),
    })
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(controller: &Controller, args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let Some(push) = controller.config().push.as_ref() else {
        return Err(CliError::Validation {
            field: "push_url".into(),
            reason: "the active profile has no push_url; live updates are disabled".into(),
        });
    };
    if let Some(ref name) = args.device {
        if controller.find_device(name).is_none() {
            return Err(CliError::device_not_found(name));
        }
    }

    output::notice(
        &format!("Watching {} (topic {}), Ctrl-C to stop", push.url, push.topic),
        global.quiet,
    );

    let mut stream = controller.devices();
    let mut previous = Arc::clone(stream.current());
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            snap = stream.changed() => {
                let Some(snap) = snap else { break };
                for change in diff(&previous, &snap, args.device.as_deref(), Local::now()) {
                    output::print_output(&render(&change, &global.output)?, global.quiet);
                }
                previous = snap;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use esplink_core::Sensor;
    use serde_json::json;

    fn device(name: &str, temp: Value) -> Arc<Device> {
        let mut sensor = Sensor::named("climate");
        sensor.state.insert("temperature".into(), temp);
        sensor.state.insert("humidity".into(), json!(40));
        Arc::new(Device {
            name: name.into(),
            sensors: vec![sensor],
            ..Device::default()
        })
    }

    #[test]
    fn reports_only_changed_channels() {
        let before = vec![device("porch", json!(20)), device("attic", json!(30))];
        let after = vec![device("porch", json!(21)), Arc::clone(&before[1])];
        let changes = diff(&before, &after, None, Local::now());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].device, "porch");
        assert_eq!(changes[0].channel, "temperature");
        assert_eq!(changes[0].value, json!(21));
    }

    #[test]
    fn device_filter_limits_output() {
        let before = vec![device("porch", json!(20)), device("attic", json!(30))];
        let after = vec![device("porch", json!(21)), device("attic", json!(31))];
        let changes = diff(&before, &after, Some("attic"), Local::now());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].device, "attic");
    }

    #[test]
    fn new_device_reports_every_channel() {
        let changes = diff(&[], &[device("porch", json!(20))], None, Local::now());
        assert_eq!(changes.len(), 2);
    }

    #[test]
    fn json_render_is_single_line() {
        let change = diff(&[], &[device("porch", json!(20))], None, Local::now()).remove(0);
        let out = render(&change, &OutputFormat::Json).unwrap();
        assert!(!out.contains('\n'));
        assert!(out.contains("\"channel\":\"temperature\""));
    }
}
