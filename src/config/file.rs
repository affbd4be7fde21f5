//! Configuration file loading.
//!
//! This module handles loading service configuration from TOML files at a
//! project-local path or an XDG-compliant location.

use crate::config::types::AppConfig;
use crate::error::ServiceError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default configuration file name for project-local config.
const LOCAL_CONFIG_NAME: &str = "qa-stream.toml";

/// Default configuration file name within XDG config directory.
const XDG_CONFIG_NAME: &str = "config.toml";

/// Application name for XDG directory lookup.
const APP_NAME: &str = "qa-stream";

/// Loads configuration.
///
/// An explicit path must exist. Otherwise the search order is:
/// 1. `./qa-stream.toml` (project-local)
/// 2. `~/.config/qa-stream/config.toml` (XDG config)
///
/// Returns the default configuration if no file is found.
///
/// # Errors
///
/// Returns a configuration error if the explicit path is missing, or if a
/// config file exists but cannot be parsed.
pub fn load(explicit: Option<&Path>) -> Result<AppConfig, ServiceError> {
    if let Some(path) = explicit {
        return from_path(path);
    }

    match search_paths().into_iter().find(|p| p.exists()) {
        Some(path) => from_path(&path),
        None => {
            debug!("no configuration file found; using defaults");
            Ok(AppConfig::default())
        }
    }
}

/// Loads configuration from a specific file path.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read
/// - The file contains invalid TOML
/// - The TOML doesn't match the expected schema
pub fn from_path(path: &Path) -> Result<AppConfig, ServiceError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        ServiceError::configuration(
            "config_file",
            format!("failed to read '{}': {}", path.display(), e),
        )
    })?;

    let config = from_str(&contents).map_err(|e| {
        ServiceError::configuration(
            "config_file",
            format!("failed to parse '{}': {}", path.display(), e),
        )
    })?;

    debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

/// Parses configuration from a TOML string.
///
/// # Errors
///
/// Returns an error if the TOML is invalid or doesn't match the schema.
pub fn from_str(toml_str: &str) -> Result<AppConfig, ServiceError> {
    toml::from_str(toml_str)
        .map_err(|e| ServiceError::configuration("config", format!("invalid TOML: {e}")))
}

/// Returns the paths that would be searched for configuration files.
#[must_use]
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG_NAME)];

    if let Some(dir) = xdg_config_dir() {
        paths.push(dir.join(XDG_CONFIG_NAME));
    }

    paths
}

/// Returns the XDG config directory for the service.
///
/// This is `~/.config/qa-stream` on most systems.
#[must_use]
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_NAME))
}
