use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::config::{sanitize_config, Config};

pub fn system_config_template_text() -> &'static str {
    include_str!("../config/config.system.toml")
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("festigraph").join("config.toml"))
}

/// Parses config text, logging and falling back to defaults on malformed TOML.
pub fn parse_config_text(text: &str, origin: &Path) -> Config {
    match toml::from_str::<Config>(text) {
        Ok(config) => sanitize_config(config),
        Err(err) => {
            warn!(
                "Failed to parse config file {}. Using defaults. error={}",
                origin.display(),
                err
            );
            sanitize_config(Config::default())
        }
    }
}

/// Loads `path`, writing the commented system template there first if it does not exist.
pub fn load_or_create_config_file(path: &Path) -> Result<Config, String> {
    if !path.exists() {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    err
                )
            })?;
        }
        info!(
            "Config file not found. Creating default config. path={}",
            path.display()
        );
        std::fs::write(path, system_config_template_text())
            .map_err(|err| format!("Failed to write default config {}: {}", path.display(), err))?;
    }

    let content = std::fs::read_to_string(path)
        .map_err(|err| format!("Failed to read config {}: {}", path.display(), err))?;
    Ok(parse_config_text(&content, path))
}

/// Resolves the explicit path or the per-user default and loads it.
pub fn load_config(explicit_path: Option<&Path>) -> Result<Config, String> {
    match explicit_path {
        Some(path) => load_or_create_config_file(path),
        None => match default_config_path() {
            Some(path) => load_or_create_config_file(&path),
            None => {
                warn!("No user config directory available. Using default config.");
                Ok(sanitize_config(Config::default()))
            }
        },
    }
}
