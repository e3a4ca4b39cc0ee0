//! Config subcommand handlers.

use dialoguer::{Input, Password, Select};
use tabled::Tabled;

use esplink_config::{Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

const MASK: &str = "****";

/// Copy of the config with plaintext secrets masked.
fn redacted(cfg: &Config) -> Config {
    let mut out = cfg.clone();
    for profile in out.profiles.values_mut() {
        if profile.api_key.is_some() {
            profile.api_key = Some(MASK.into());
        }
    }
    out
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// Ask where to keep an API key. Returns the plaintext value to put in the
/// profile, or `None` when the key went to the keyring.
fn prompt_key_storage(profile_name: &str, key: String) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Where to store the API key?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        esplink_config::store_api_key(profile_name, &key)?;
        eprintln!("   ✓ API key stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(key))
    }
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "")]
    active: String,
    #[tabled(rename = "Profile")]
    name: String,
    #[tabled(rename = "URL")]
    url: String,
    #[tabled(rename = "Push")]
    push: String,
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("esplink configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let mut cfg = config::load_config_or_default();

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let url: String = Input::new()
                .with_prompt("Panel URL")
                .default("http://localhost:5000".into())
                .validate_with(|v: &String| {
                    esplink_config::parse_url("url", v)
                        .map(|_| ())
                        .map_err(|e| e.to_string())
                })
                .interact_text()
                .map_err(prompt_err)?;

            let push_url: String = Input::new()
                .with_prompt("Push feed URL (empty to disable live updates)")
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_err)?;

            let key = Password::new()
                .with_prompt("API key (empty for none)")
                .allow_empty_password(true)
                .interact()
                .map_err(prompt_err)?;

            let api_key = match non_empty(key) {
                Some(key) => prompt_key_storage(&profile_name, key)?,
                None => None,
            };

            let profile = Profile {
                url,
                api_key,
                push_url: non_empty(push_url),
                ..Profile::default()
            };
            cfg.profiles.insert(profile_name.clone(), profile);
            if cfg.profiles.len() == 1 {
                cfg.default_profile = Some(profile_name.clone());
            }

            let path = config::save_config(&cfg)?;
            eprintln!("\n   ✓ Profile '{profile_name}' saved to {}", path.display());
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config_or_default());
            let toml_text = toml::to_string_pretty(&cfg)?;
            let out = output::render_single(
                &global.output,
                &cfg,
                |_| toml_text.clone(),
                |c| c.default_profile.clone().unwrap_or_default(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let active = config::active_profile_name(global, &cfg);
            let names: Vec<&String> = cfg.profiles.keys().collect();
            let out = output::render_list(
                &global.output,
                names.as_slice(),
                |name| {
                    let p = &cfg.profiles[*name];
                    ProfileRow {
                        active: if **name == active { "*".into() } else { String::new() },
                        name: (*name).clone(),
                        url: p.url.clone(),
                        push: p.push_url.clone().unwrap_or_default(),
                    }
                },
                |name| (*name).clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: cfg.profile_names(),
                    name,
                });
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            output::notice(&format!("Default profile set to '{name}'"), global.quiet);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redaction_masks_plaintext_keys_only() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "home".into(),
            Profile {
                url: "http://panel".into(),
                api_key: Some("secret".into()),
                ..Profile::default()
            },
        );
        cfg.profiles.insert(
            "lab".into(),
            Profile {
                url: "http://lab".into(),
                api_key_env: Some("LAB_KEY".into()),
                ..Profile::default()
            },
        );
        let shown = redacted(&cfg);
        assert_eq!(shown.profiles["home"].api_key.as_deref(), Some(MASK));
        assert!(shown.profiles["lab"].api_key.is_none());
        assert_eq!(shown.profiles["lab"].api_key_env.as_deref(), Some("LAB_KEY"));
    }
}
