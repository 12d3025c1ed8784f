//! Configuration file discovery, TOML loading and default locations
//!
//! Resolution follows a fixed priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! Steps 1 and 2 are handled by each binary's clap definitions; this module
//! covers config file discovery, parsing and the compiled defaults.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Application directory name used under platform config/data dirs
pub const APP_DIR_NAME: &str = "interio";

/// Environment variable that points at a config file
pub const CONFIG_ENV_VAR: &str = "INTERIO_CONFIG";

/// Locate the TOML config file.
///
/// An explicit path (CLI or environment) is returned as-is even if it does not
/// exist, so that [`load_toml_config`] can report it. Otherwise the user config
/// (`~/.config/interio/config.toml`) is preferred over the system config
/// (`/etc/interio/config.toml`); `None` means no file was found.
pub fn locate_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc").join(APP_DIR_NAME).join("config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Load a TOML config into `T`.
///
/// A missing file is not fatal and yields `T::default()`. A file that exists
/// but cannot be parsed is a configuration error.
///
/// Runs before logging is configured, so callers report the outcome.
pub fn load_toml_config<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path.filter(|p| p.exists()) else {
        return Ok(T::default());
    };

    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str::<T>(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

    Ok(config)
}

/// Get OS-dependent default data folder
pub fn default_data_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/interio (or /var/lib/interio for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("/var/lib").join(APP_DIR_NAME))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support").join(APP_DIR_NAME))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData").join(APP_DIR_NAME))
    } else {
        PathBuf::from("./interio_data")
    }
}

/// Default SQLite database location
pub fn default_database_path() -> PathBuf {
    default_data_folder().join("interio.db")
}
