//! Link command handlers.

use tabled::Tabled;

use esplink_core::link::{self, LinkRow};
use esplink_core::{CatalogCache, Controller, LinkValue, Sensor};

use crate::cli::{GlobalOpts, LinksArgs, LinksCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct LinkTableRow {
    #[tabled(rename = "Channel")]
    channel: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Linked To")]
    target: String,
}

fn table_row(row: &LinkRow, sensor: &Sensor, catalog: &CatalogCache, color: bool) -> LinkTableRow {
    let value = row.value();
    LinkTableRow {
        channel: row.name.clone(),
        value: sensor.format_state(&row.name).unwrap_or_default(),
        target: if value.is_mapped() {
            catalog.describe(&value)
        } else {
            output::unlinked_label(color)
        },
    }
}

/// Parse `CHANNEL=OBJECT.PROPERTY`.
fn parse_assignment(raw: &str) -> Result<(String, LinkValue), CliError> {
    let invalid = |reason: &str| CliError::Validation {
        field: "link".into(),
        reason: format!("'{raw}': {reason}"),
    };

    let (channel, target) = raw
        .split_once('=')
        .ok_or_else(|| invalid("expected CHANNEL=OBJECT.PROPERTY"))?;
    let channel = channel.trim();
    if channel.is_empty() {
        return Err(invalid("channel is empty"));
    }

    match LinkValue::parse(target.trim()) {
        LinkValue::Mapped { object, property } if !object.is_empty() && !property.is_empty() => {
            Ok((channel.to_owned(), LinkValue::Mapped { object, property }))
        }
        _ => Err(invalid("target must be OBJECT.PROPERTY with exactly one '.'")),
    }
}

/// Stderr hints for targets the catalog does not know about.
fn catalog_hints(catalog: &CatalogCache, value: &LinkValue) -> Option<String> {
    let LinkValue::Mapped { object, property } = value else {
        return None;
    };
    if catalog.is_empty() {
        return None;
    }
    if !catalog.contains(object) {
        return Some(format!("warning: object '{object}' is not in the catalog"));
    }
    let props = catalog.properties(object);
    if !props.is_empty() && !props.iter().any(|p| p == property) {
        return Some(format!("warning: '{object}' has no property '{property}'"));
    }
    None
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(controller: &Controller, args: LinksArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        LinksCommand::Show { device, sensor } => {
            let d = util::find_device(controller, &device)?;
            let s = util::find_sensor(&d, &sensor)?;
            let rows = link::decode(s);
            let color = output::should_color(&global.color);
            let catalog = controller.catalog();
            let out = output::render_list(
                &global.output,
                rows.as_slice(),
                |r| table_row(r, s, catalog, color),
                |r| format!("{}={}", r.name, r.value()),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        LinksCommand::Set {
            device,
            sensor,
            links,
        } => {
            let assignments = links
                .iter()
                .map(|raw| parse_assignment(raw))
                .collect::<Result<Vec<_>, _>>()?;

            let mut draft = util::edit_device(controller, &device)?;
            let mut editor = draft
                .edit_links(&sensor)
                .ok_or_else(|| CliError::sensor_not_found(&device, &sensor))?;

            for (channel, value) in assignments {
                if let Some(hint) = catalog_hints(controller.catalog(), &value) {
                    output::notice(&hint, global.quiet);
                }
                if !editor.set(&channel, value) {
                    return Err(CliError::Validation {
                        field: "channel".into(),
                        reason: format!("sensor '{sensor}' has no channel '{channel}'"),
                    });
                }
            }

            draft.save_links(editor)?;
            controller.save_device(draft).await?;
            output::notice("Links saved", global.quiet);
            Ok(())
        }

        LinksCommand::Clear {
            device,
            sensor,
            channels,
        } => {
            let mut draft = util::edit_device(controller, &device)?;
            let mut editor = draft
                .edit_links(&sensor)
                .ok_or_else(|| CliError::sensor_not_found(&device, &sensor))?;

            if channels.is_empty() {
                editor.clear_all();
            }
            for channel in &channels {
                if !editor.clear(channel) {
                    return Err(CliError::Validation {
                        field: "channel".into(),
                        reason: format!("sensor '{sensor}' has no channel '{channel}'"),
                    });
                }
            }

            draft.save_links(editor)?;
            controller.save_device(draft).await?;
            output::notice("Links cleared", global.quiet);
            Ok(())
        }
    }
}
