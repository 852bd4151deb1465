//! Application configuration management.
//!
//! Configuration is read from `~/.config/mapmarkers/config.json` when it
//! exists, then overridden by `MAPMARKERS_*` environment variables.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::StoreOptions;

/// Application name used for the config directory path
const APP_NAME: &str = "mapmarkers";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Consider the marker cache stale after 1 hour.
const DEFAULT_STALE_AFTER_MINUTES: i64 = 60;

const ENV_API_URL: &str = "MAPMARKERS_API_URL";
const ENV_TOKEN: &str = "MAPMARKERS_TOKEN";
const ENV_TIMEOUT_SECS: &str = "MAPMARKERS_TIMEOUT_SECS";
const ENV_REQUIRE_FULL_ADDRESS: &str = "MAPMARKERS_REQUIRE_FULL_ADDRESS";
const ENV_STALE_MINUTES: &str = "MAPMARKERS_STALE_MINUTES";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    /// Bearer token sent with every request. Obtained elsewhere.
    pub token: Option<String>,
    pub request_timeout_secs: u64,
    /// Whether `add` insists on a full address.
    pub require_full_address: bool,
    pub stale_after_minutes: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            require_full_address: true,
            stale_after_minutes: DEFAULT_STALE_AFTER_MINUTES,
        }
    }
}

impl Config {
    /// Load the config file (or defaults) and apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            debug!(path = %path.display(), "Loading config file");
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Apply overrides from a variable lookup (the process environment in `load`).
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_base_url = url;
        }
        if let Some(token) = lookup(ENV_TOKEN) {
            self.token = Some(token).filter(|t| !t.is_empty());
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = secs
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of seconds", ENV_TIMEOUT_SECS))?;
            if secs == 0 {
                anyhow::bail!("{} must be greater than zero", ENV_TIMEOUT_SECS);
            }
            self.request_timeout_secs = secs;
        }
        if let Some(flag) = lookup(ENV_REQUIRE_FULL_ADDRESS) {
            self.require_full_address = parse_flag(&flag)
                .with_context(|| format!("{} must be true or false", ENV_REQUIRE_FULL_ADDRESS))?;
        }
        if let Some(minutes) = lookup(ENV_STALE_MINUTES) {
            self.stale_after_minutes = minutes
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of minutes", ENV_STALE_MINUTES))?;
        }
        Ok(())
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            require_full_address: self.require_full_address,
            stale_after_minutes: self.stale_after_minutes,
        }
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow::anyhow!("Unrecognized flag value: {}", other)),
    }
}
