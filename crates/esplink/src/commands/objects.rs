//! Object catalog command handlers.

use tabled::Tabled;

use esplink_core::{CatalogEntry, Controller};

use crate::cli::{GlobalOpts, ObjectsArgs, ObjectsCommand};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ObjectRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Properties")]
    properties: String,
}

impl From<&CatalogEntry> for ObjectRow {
    fn from(e: &CatalogEntry) -> Self {
        Self {
            id: e.id.clone(),
            description: e.description.clone(),
            properties: e.properties.join(", "),
        }
    }
}

fn detail(e: &CatalogEntry) -> String {
    let mut lines = vec![
        format!("ID:          {}", e.id),
        format!(
            "Description: {}",
            if e.description.is_empty() { "-" } else { &e.description }
        ),
    ];
    if !e.properties.is_empty() {
        lines.push(String::from("Properties:"));
        lines.extend(e.properties.iter().map(|p| format!("  {}.{p}", e.id)));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(controller: &Controller, args: ObjectsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ObjectsCommand::List => {
            let entries = controller.catalog().entries();
            let out = output::render_list(
                &global.output,
                entries.as_slice(),
                |e| ObjectRow::from(e),
                |e| e.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ObjectsCommand::Get { object } => {
            let entry = controller.catalog().get(&object).ok_or_else(|| CliError::NotFound {
                resource_type: "object".into(),
                identifier: object.clone(),
                list_command: "objects list".into(),
            })?;
            let out = output::render_single(&global.output, &entry, detail, |e| e.id.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
