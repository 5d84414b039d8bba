//! Configuration resolution for Parley.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (`~/.config/parley/settings.json`) or an explicit file
//! 3. Environment variables
//! 4. CLI arguments (applied by the binary, highest priority)
//!
//! The token signing key is deliberately absent: it is read once at startup
//! from the CLI or `PARLEY_JWT_SECRET` and never from a file on disk.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// One hour.
pub const DEFAULT_ACCESS_TTL_SECS: i64 = 60 * 60;

/// Thirty days.
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// Complete Parley configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Listener, storage and logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub database_path: Option<PathBuf>,
    pub log_json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_path: None,
            log_json: false,
        }
    }
}

/// Token lifetimes and password hashing cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    /// Random bytes per credential salt.
    pub salt_len: usize,
    /// Argon2id memory cost in KiB.
    pub hash_memory_kib: u32,
    pub hash_iterations: u32,
    pub hash_parallelism: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_ttl_secs: DEFAULT_ACCESS_TTL_SECS,
            refresh_ttl_secs: DEFAULT_REFRESH_TTL_SECS,
            salt_len: 32,
            hash_memory_kib: 64 * 1024,
            hash_iterations: 1,
            hash_parallelism: 1,
        }
    }
}

/// Load configuration with hierarchical resolution.
///
/// `explicit` replaces the global settings file when given; unlike the
/// global file it must exist.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut config = match explicit {
        Some(path) => load_config_file(path)?,
        None => match global_config_path() {
            Some(path) if path.exists() => load_config_file(&path)?,
            _ => Config::default(),
        },
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("settings.json"))
}

/// Default location of the chat database.
pub fn database_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("parley.db"))
}

fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|h| PathBuf::from(h).join(".parley"))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library/Application Support/parley"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
            .map(|p| p.join("parley"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Apply `PARLEY_*` overrides read through `lookup`.
///
/// A present but unparsable value is an error rather than silently ignored.
pub fn apply_env_overrides(
    config: &mut Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(val) = lookup("PARLEY_ADDR") {
        config.server.addr = parse_env("PARLEY_ADDR", &val)?;
    }
    if let Some(val) = lookup("PARLEY_DB_PATH") {
        config.server.database_path = Some(PathBuf::from(val));
    }
    if let Some(val) = lookup("PARLEY_LOG_JSON") {
        config.server.log_json = parse_env("PARLEY_LOG_JSON", &val)?;
    }
    if let Some(val) = lookup("PARLEY_ACCESS_TTL") {
        config.auth.access_ttl_secs = parse_env("PARLEY_ACCESS_TTL", &val)?;
    }
    if let Some(val) = lookup("PARLEY_REFRESH_TTL") {
        config.auth.refresh_ttl_secs = parse_env("PARLEY_REFRESH_TTL", &val)?;
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(key: &str, val: &str) -> Result<T> {
    val.parse()
        .map_err(|_| Error::Config(format!("{key} has an invalid value: {val:?}")))
}
