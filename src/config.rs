// src/config.rs

//! Configuration loading utilities.
//!
//! Reads the TOML file, then lets the environment override credentials so
//! secrets need not live on disk.

use std::path::Path;

use crate::error::Result;
use crate::models::Config;

/// Environment variables that override `[api]` settings.
pub const ENV_CLIENT_ID: &str = "UNTAPPD_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "UNTAPPD_CLIENT_SECRET";
pub const ENV_API_URL: &str = "UNTAPPD_API_URL";
pub const ENV_APP_NAME: &str = "UNTAPPD_APP_NAME";

/// Load configuration from a TOML file and the process environment.
///
/// Falls back to defaults if the file cannot be loaded. The merged result
/// is validated.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        Config::load_or_default(path)
    } else {
        log::info!("No config at {}, using defaults", path.display());
        Config::default()
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    config.validate()?;
    Ok(config)
}

/// Apply non-blank variables returned by `lookup` over the file settings.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    let overrides = [
        (ENV_CLIENT_ID, &mut config.api.client_id),
        (ENV_CLIENT_SECRET, &mut config.api.client_secret),
        (ENV_API_URL, &mut config.api.base_url),
        (ENV_APP_NAME, &mut config.api.app_name),
    ];

    for (name, field) in overrides {
        if let Some(value) = lookup(name).filter(|v| !v.trim().is_empty()) {
            log::debug!("Config override from {}", name);
            *field = value.trim().to_string();
        }
    }
}
