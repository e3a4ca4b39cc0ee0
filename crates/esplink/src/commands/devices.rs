//! Device command handlers.

use std::fmt::Write as _;
use std::sync::Arc;

use tabled::Tabled;

use esplink_core::{CommandResult, Controller, Device};

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Sensors")]
    sensors: usize,
    #[tabled(rename = "Links")]
    links: usize,
    #[tabled(rename = "Firmware")]
    firmware: String,
}

impl DeviceRow {
    fn new(d: &Device, color: bool) -> Self {
        Self {
            id: d.id.map(|id| id.to_string()).unwrap_or_default(),
            name: d.name.clone(),
            address: d.address(),
            status: output::connection_label(d.connected, color),
            sensors: d.sensors.len(),
            links: d.linked_channel_count(),
            firmware: d.firmware_version.clone().unwrap_or_default(),
        }
    }
}

fn detail(d: &Arc<Device>) -> String {
    let mut out = [
        format!("ID:       {}", d.id.map_or_else(|| "-".into(), |id| id.to_string())),
        format!("Name:     {}", d.name),
        format!("Address:  {}", d.address()),
        format!("Status:   {}", output::connection_label(d.connected, false)),
        format!(
            "Seen:     {}",
            d.last_seen
                .map_or_else(|| "-".into(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        ),
        format!("Firmware: {}", util::or_dash(d.firmware_version.as_deref())),
        format!("Password: {}", if d.password.is_some() { "set" } else { "-" }),
    ]
    .join("\n");

    if !d.sensors.is_empty() {
        out.push_str("\n\nSensors:");
        for s in &d.sensors {
            let linked = s.links.values().filter(|l| !l.is_empty()).count();
            let _ = write!(
                out,
                "\n  {} ({}): {} channel(s), {linked} linked",
                s.name,
                s.kind,
                s.state.len()
            );
        }
    }
    out
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List => {
            let snap = controller.devices_snapshot();
            let color = output::should_color(&global.color);
            let out = output::render_list(
                &global.output,
                snap.as_slice(),
                |d| DeviceRow::new(d, color),
                |d| d.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Get { device } => {
            let d = util::find_device(controller, &device)?;
            let out = output::render_single(&global.output, &d, detail, |d| d.name.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Create {
            name,
            host,
            port,
            password,
        } => {
            let mut draft = controller.new_device();
            draft
                .set_name(name)
                .set_host(host)
                .set_port(port)
                .set_password(password);
            controller.save_device(draft).await?;
            output::notice("Device created", global.quiet);
            Ok(())
        }

        DevicesCommand::Update {
            device,
            name,
            host,
            port,
            password,
        } => {
            let mut draft = util::edit_device(controller, &device)?;
            if let Some(name) = name {
                draft.set_name(name);
            }
            if let Some(host) = host {
                draft.set_host(host);
            }
            if let Some(port) = port {
                draft.set_port(port);
            }
            if password.is_some() {
                draft.set_password(password);
            }
            controller.save_device(draft).await?;
            output::notice("Device updated", global.quiet);
            Ok(())
        }

        DevicesCommand::Delete { device } => {
            let d = util::find_device(controller, &device)?;
            let confirmed = util::confirm(
                &format!("Delete device {} and its sensors?", d.name),
                global.yes,
            )?;
            match controller.delete_device(&d, confirmed).await? {
                CommandResult::Ok => output::notice("Device deleted", global.quiet),
                CommandResult::Cancelled => output::notice("Delete cancelled", global.quiet),
            }
            Ok(())
        }

        DevicesCommand::Reconnect { device } => {
            let d = util::find_device(controller, &device)?;
            controller.reconnect_device(&d).await?;
            output::notice("Reconnect requested", global.quiet);
            Ok(())
        }
    }
}
