//! Application configuration

use anyhow::Result;
use sbar_core::constants::{DEFAULT_NOTIFY_PATH, DEFAULT_TICK_INTERVAL, DEFAULT_WAIT_TIMEOUT};
use sbar_core::FormatConfig;
use sbar_sources::DEFAULT_TIME_FORMAT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application-wide configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Version of the config format
    pub version: u32,
    /// Interval between full refreshes
    pub tick_interval_ms: u64,
    /// Longest wait for a notification before checking the tick deadline
    pub wait_timeout_ms: u64,
    /// File watched for dirty-set notifications
    pub notify_path: PathBuf,
    /// strftime pattern of the time field
    pub time_format: String,
    /// Format strings of the status line and every composite
    pub formats: FormatConfig,
}

impl AppConfig {
    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_from_path(&config_path)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)?;
        Ok(config_path)
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("org", "sbar", "sbar")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("config.json"))
    }

    /// Load configuration from a specific file path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a specific file path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms.max(1))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            tick_interval_ms: DEFAULT_TICK_INTERVAL.as_millis() as u64,
            wait_timeout_ms: DEFAULT_WAIT_TIMEOUT.as_millis() as u64,
            notify_path: PathBuf::from(DEFAULT_NOTIFY_PATH),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            formats: FormatConfig::default(),
        }
    }
}
