//! Configuration file loading and platform default paths
//!
//! Every GameDex service reads an optional TOML file. A missing or broken
//! file never stops a service from starting: a warning is logged and compiled
//! defaults are used instead.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Application directory name under the platform config/data directories
const APP_DIR: &str = "gamedex";

/// TOML configuration file contents
///
/// All fields are optional; services fill gaps from environment variables and
/// compiled defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Listen address, e.g. "127.0.0.1:5740"
    pub bind: Option<String>,
    pub provider: ProviderConfig,
    pub cache: CacheConfig,
    pub discovery: DiscoveryConfig,
    pub monthly: MonthlyConfig,
    pub logging: LoggingConfig,
}

/// Metadata provider credentials and limits
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Base URL for provider queries
    pub base_url: Option<String>,
    /// OAuth client-credentials token endpoint
    pub identity_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub requests_per_second: Option<u32>,
}

/// Tiered cache settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Shared external cache; absent disables the tier
    pub redis_url: Option<String>,
    /// On-disk tier directory
    pub directory: Option<PathBuf>,
    pub ttl_secs: Option<u64>,
    pub sweep_interval_secs: Option<u64>,
}

/// Discovery section settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Shared secret required by the manual refresh endpoint
    pub refresh_api_key: Option<String>,
    /// Background refresh period; 0 disables it
    pub refresh_interval_secs: Option<u64>,
}

/// Monthly subscription catalogue
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MonthlyConfig {
    /// JSON file mapping "YYYY-MM" periods to subscription entries
    pub data_file: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level ("trace", "debug", "info", "warn", "error")
    pub level: Option<String>,
}

/// Default TOML path for a service: `<config_dir>/gamedex/<module>.toml`
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join(format!("{}.toml", module_name)))
}

/// OS-dependent data directory for GameDex
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("./gamedex_data"))
}

/// Read and parse a TOML config file, failing on any error
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load a TOML config file, falling back to defaults on any problem
pub fn load_toml_config(path: &Path) -> TomlConfig {
    if !path.exists() {
        info!("No config file at {}, using defaults", path.display());
        return TomlConfig::default();
    }

    match read_toml_config(path) {
        Ok(config) => {
            info!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("{}; using defaults", e);
            TomlConfig::default()
        }
    }
}

/// Read an environment variable, treating empty/whitespace values as unset
pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| is_valid_key(v))
}

/// Validate a key or credential (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Pick the first valid value from ENV then TOML
///
/// Logs which source won so misconfiguration is visible at startup.
pub fn resolve_setting(name: &str, env_name: &str, toml_value: Option<&String>) -> Option<String> {
    if let Some(value) = env_var(env_name) {
        info!("{} loaded from environment variable {}", name, env_name);
        return Some(value);
    }

    if let Some(value) = toml_value.filter(|v| is_valid_key(v)) {
        info!("{} loaded from TOML config", name);
        return Some(value.clone());
    }

    None
}
