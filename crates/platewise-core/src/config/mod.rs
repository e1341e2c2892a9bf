//! Configuration management for platewise.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. All config structs implement `Default`.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use crate::health::DeviceTimeZone;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Largest accepted value for the hour-valued cleanup settings (100 years).
pub const MAX_HOURS: u64 = 24 * 365 * 100;

/// Root configuration structure for platewise.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Job runtime settings
    pub jobs: JobsConfig,

    /// Retry backoff settings
    pub retry: RetryConfig,

    /// Photo cache cleanup settings
    pub cleanup: CleanupConfig,

    /// Health record settings
    pub health: HealthConfig,

    /// Remote analysis settings
    pub analysis: AnalysisConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.platewise.platewise/config.toml
    /// - Linux: ~/.config/platewise/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\platewise\config\config.toml
    ///
    /// Falls back to ~/.platewise/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "platewise", "platewise")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".platewise").join("config.toml")
            })
    }

    /// Get the resolved data directory (with ~ expansion).
    pub fn data_dir(&self) -> PathBuf {
        let path_str = self.general.data_dir.to_string_lossy();
        let expanded = shellexpand::tilde(&path_str);
        PathBuf::from(expanded.into_owned())
    }

    /// Directory holding captured photos awaiting analysis.
    pub fn photo_dir(&self) -> PathBuf {
        self.data_dir().join("photos")
    }

    /// Path of the JSON-lines health journal.
    pub fn journal_path(&self) -> PathBuf {
        self.data_dir().join("health.jsonl")
    }

    /// Parsed device time zone.
    pub fn time_zone(&self) -> Result<DeviceTimeZone, ConfigError> {
        self.health
            .timezone
            .parse()
            .map_err(|e: String| ConfigError::ValidationError(format!("health.timezone: {e}")))
    }

    /// Deadline for a single analysis call.
    pub fn analysis_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.jobs.analysis_timeout_ms)
    }

    /// Retention window as a chrono duration.
    pub fn retention_window(&self) -> Result<chrono::Duration, ConfigError> {
        hours_setting("cleanup.retention_hours", self.cleanup.retention_hours)
    }

    /// Sweep interval.
    pub fn cleanup_interval(&self) -> Result<chrono::Duration, ConfigError> {
        hours_setting("cleanup.interval_hours", self.cleanup.interval_hours)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

fn hours_setting(name: &str, hours: u64) -> Result<chrono::Duration, ConfigError> {
    let out_of_range =
        || ConfigError::ValidationError(format!("{name} must be between 1 and {MAX_HOURS}"));
    if hours == 0 || hours > MAX_HOURS {
        return Err(out_of_range());
    }
    i64::try_from(hours)
        .ok()
        .and_then(chrono::TimeDelta::try_hours)
        .ok_or_else(out_of_range)
}
