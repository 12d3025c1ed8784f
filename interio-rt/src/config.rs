//! Configuration for interio-rt
//!
//! Settings sources, highest priority first:
//!
//! 1. Command-line arguments
//! 2. Environment variables (`INTERIO_*`, resolved by clap alongside 1)
//! 3. TOML configuration file
//! 4. Built-in defaults
//!
//! A missing TOML file is not an error; defaults apply.

use interio_common::config::{default_database_path, load_toml_config, locate_config_file};
use interio_common::{Error, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::models::LeaderboardOrder;
use crate::pagination::{DEFAULT_LIMIT, MAX_LIMIT};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5790";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_MAX_LOCK_WAIT_MS: u64 = 5000;

/// Contents of the TOML config file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub bind_addr: Option<String>,
    pub database_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub max_lock_wait_ms: Option<u64>,
    pub leaderboard: TomlLeaderboard,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlLeaderboard {
    pub order: Option<LeaderboardOrder>,
    pub default_limit: Option<i64>,
    pub max_limit: Option<i64>,
}

impl TomlConfig {
    /// Load from `explicit` or the standard locations
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        load_toml_config(locate_config_file(explicit).as_deref())
    }
}

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind_addr: Option<String>,
    pub database_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub max_lock_wait_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderboardConfig {
    pub order: LeaderboardOrder,
    pub default_limit: i64,
    pub max_limit: i64,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            order: LeaderboardOrder::default(),
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
        }
    }
}

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
    pub log_level: String,
    pub max_lock_wait_ms: u64,
    pub leaderboard: LeaderboardConfig,
}

impl Config {
    /// Merge overrides over the file contents over defaults
    pub fn resolve(overrides: ConfigOverrides, file: TomlConfig) -> Result<Self> {
        let bind_addr_raw = overrides
            .bind_addr
            .or(file.bind_addr)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr_raw.parse::<SocketAddr>().map_err(|e| {
            Error::Config(format!("Invalid bind_addr '{}': {}", bind_addr_raw, e))
        })?;

        let database_path = overrides
            .database_path
            .or(file.database_path)
            .unwrap_or_else(default_database_path);

        let log_level = overrides
            .log_level
            .or(file.log_level)
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let max_lock_wait_ms = overrides
            .max_lock_wait_ms
            .or(file.max_lock_wait_ms)
            .unwrap_or(DEFAULT_MAX_LOCK_WAIT_MS);

        let leaderboard = resolve_leaderboard(file.leaderboard)?;

        Ok(Self {
            bind_addr,
            database_path,
            log_level,
            max_lock_wait_ms,
            leaderboard,
        })
    }
}

fn resolve_leaderboard(file: TomlLeaderboard) -> Result<LeaderboardConfig> {
    let defaults = LeaderboardConfig::default();
    let max_limit = file.max_limit.unwrap_or(defaults.max_limit);
    if max_limit < 1 {
        return Err(Error::Config(format!(
            "leaderboard.max_limit must be at least 1 (got {})",
            max_limit
        )));
    }

    let mut default_limit = file.default_limit.unwrap_or(defaults.default_limit);
    if default_limit < 1 || default_limit > max_limit {
        let clamped = default_limit.clamp(1, max_limit);
        warn!(
            "leaderboard.default_limit {} outside [1, {}], using {}",
            default_limit, max_limit, clamped
        );
        default_limit = clamped;
    }

    Ok(LeaderboardConfig {
        order: file.order.unwrap_or(defaults.order),
        default_limit,
        max_limit,
    })
}
