//! CLI-side configuration: applies `GlobalOpts` overrides on top of the
//! shared `esplink-config` profiles.
//!
//! Core never sees these types -- it receives a pre-built `ControllerConfig`.

use std::time::Duration;

use secrecy::SecretString;

use esplink_config::{Config, Defaults, Profile};
use esplink_core::ControllerConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use esplink_config::{config_path, load_config_or_default, save_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// Build a `ControllerConfig` from the config file, profile, and CLI overrides.
///
/// `live` keeps the profile's push feed; one-shot commands drop it.
pub fn build_controller_config(global: &GlobalOpts, live: bool) -> Result<ControllerConfig, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let mut config = match cfg.profiles.get(&profile_name) {
        Some(profile) => resolve_profile(profile, &profile_name, &cfg.defaults, global)?,
        None => from_flags(global, &cfg, &profile_name)?,
    };

    if !live {
        config.push = None;
    }
    Ok(config)
}

/// Translate a `Profile` + global flags into a `ControllerConfig`.
fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
    global: &GlobalOpts,
) -> Result<ControllerConfig, CliError> {
    let mut config = esplink_config::profile_to_controller_config(profile, profile_name, defaults)?;

    // Flag > env > profile
    if let Some(ref raw) = global.url {
        config.url = esplink_config::parse_url("url", raw)?;
    }
    if let Some(ref key) = global.api_key {
        config.api_key = Some(SecretString::from(key.clone()));
    }
    if let Some(secs) = global.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    if global.insecure {
        config.accept_invalid_certs = true;
    }
    Ok(config)
}

/// No profile found -- build from CLI flags / env vars alone.
fn from_flags(global: &GlobalOpts, cfg: &Config, profile_name: &str) -> Result<ControllerConfig, CliError> {
    let Some(raw) = global.url.as_deref() else {
        if global.profile.is_some() {
            return Err(CliError::ProfileNotFound {
                name: profile_name.into(),
                available: cfg.profile_names(),
            });
        }
        return Err(CliError::NoConfig {
            path: config_path().display().to_string(),
        });
    };

    let mut config = ControllerConfig::new(esplink_config::parse_url("url", raw)?);
    config.api_key = global.api_key.clone().map(SecretString::from);
    config.timeout = Duration::from_secs(global.timeout.unwrap_or(cfg.defaults.timeout));
    config.accept_invalid_certs = global.insecure || cfg.defaults.insecure;
    config.event_queue_capacity = cfg.defaults.event_queue;
    Ok(config)
}
