//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! where the authentication endpoint lives, how long to wait for it, how
//! long toasts stay up, where new accounts are created, and the last
//! e-mail used to sign in.
//!
//! Configuration is stored at `~/.config/logon/config.json`. Environment
//! variables (`LOGON_*`) override values read from the file.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::client::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::notifications::DEFAULT_DISPLAY_MS;

/// Application name used for config/data directory paths
const APP_NAME: &str = "logon";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Where the authentication service listens during local development
const DEFAULT_API_BASE_URL: &str = "http://localhost:3333";

const ENV_API_URL: &str = "LOGON_API_URL";
const ENV_REQUEST_TIMEOUT_SECS: &str = "LOGON_REQUEST_TIMEOUT_SECS";
const ENV_TOAST_DURATION_MS: &str = "LOGON_TOAST_DURATION_MS";
const ENV_DATA_DIR: &str = "LOGON_DATA_DIR";
const ENV_SIGNUP_URL: &str = "LOGON_SIGNUP_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub toast_duration_ms: u64,
    pub data_dir: Option<PathBuf>,
    /// Page where new accounts are created. Unset when sign-up happens
    /// outside this tool.
    pub signup_url: Option<String>,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            toast_duration_ms: DEFAULT_DISPLAY_MS,
            data_dir: None,
            signup_url: None,
            last_email: None,
        }
    }
}

impl Config {
    /// Load the config file and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply overrides from `lookup`, ignoring values that do not parse.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url;
        }
        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            match raw.trim().parse() {
                Ok(secs) => self.request_timeout_secs = secs,
                Err(_) => warn!(value = %raw, "Ignoring invalid {}", ENV_REQUEST_TIMEOUT_SECS),
            }
        }
        if let Some(raw) = lookup(ENV_TOAST_DURATION_MS) {
            match raw.trim().parse() {
                Ok(ms) => self.toast_duration_ms = ms,
                Err(_) => warn!(value = %raw, "Ignoring invalid {}", ENV_TOAST_DURATION_MS),
            }
        }
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(url) = lookup(ENV_SIGNUP_URL).filter(|v| !v.trim().is_empty()) {
            self.signup_url = Some(url);
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_duration_ms)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the persisted session and log files.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir =
            dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }
}
