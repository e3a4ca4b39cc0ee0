//! Sensor command handlers.

use std::fmt::Write as _;

use serde::Serialize;
use tabled::Tabled;

use esplink_core::{Controller, Sensor};

use crate::cli::{GlobalOpts, SensorsArgs, SensorsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SensorRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Linked")]
    linked: String,
}

impl From<&Sensor> for SensorRow {
    fn from(s: &Sensor) -> Self {
        let state = s
            .state
            .iter()
            .map(|(k, v)| format!("{k}={}", s.format_value(v)))
            .collect::<Vec<_>>()
            .join(", ");
        let linked = s.links.values().filter(|l| !l.is_empty()).count();
        Self {
            name: s.name.clone(),
            kind: s.kind.to_string(),
            class: s.device_class.clone().unwrap_or_default(),
            state,
            linked: format!("{linked}/{}", s.state.len()),
        }
    }
}

/// Sensor plus its owning device, for structured output.
#[derive(Serialize)]
struct SensorView<'a> {
    device: &'a str,
    #[serde(flatten)]
    sensor: &'a Sensor,
}

fn detail(view: &SensorView<'_>) -> String {
    let s = view.sensor;
    let mut out = [
        format!("Device:   {}", view.device),
        format!("Name:     {}", s.name),
        format!("Kind:     {}", s.kind),
        format!("Class:    {}", util::or_dash(s.device_class.as_deref())),
        format!("Unit:     {}", util::or_dash(s.unit.as_deref())),
        format!("Icon:     {}", util::or_dash(s.icon.as_deref())),
        format!("Key:      {}", util::or_dash(s.key.as_deref())),
        format!(
            "Decimals: {}",
            s.accuracy_decimals.map_or_else(|| "-".into(), |d| d.to_string())
        ),
    ]
    .join("\n");

    if !s.state.is_empty() {
        out.push_str("\n\nChannels:");
        for (channel, value) in &s.state {
            let link = s.links.get(channel).filter(|l| !l.is_empty());
            let _ = write!(
                out,
                "\n  {channel}: {} -> {}",
                s.format_value(value),
                util::or_dash(link.map(String::as_str))
            );
        }
    }
    out
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(controller: &Controller, args: SensorsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        SensorsCommand::List { device } => {
            let d = util::find_device(controller, &device)?;
            let out = output::render_list(
                &global.output,
                d.sensors.as_slice(),
                |s| SensorRow::from(s),
                |s| s.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SensorsCommand::Get { device, sensor } => {
            let d = util::find_device(controller, &device)?;
            let view = SensorView {
                device: &d.name,
                sensor: util::find_sensor(&d, &sensor)?,
            };
            let out = output::render_single(&global.output, &view, detail, |v| v.sensor.name.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
