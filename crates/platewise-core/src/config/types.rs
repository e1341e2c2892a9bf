//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Root directory for photos and the health journal
    pub data_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("~/.platewise"),
        }
    }
}

/// Background job runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Maximum number of analysis jobs running at once.
    /// Jobs are I/O-bound and capture is sequential, so 1-2 is plenty.
    pub max_concurrent: usize,

    /// Deadline for a single remote analysis call in milliseconds
    pub analysis_timeout_ms: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 1,
            analysis_timeout_ms: 60_000,
        }
    }
}

/// Backoff settings. The attempt limit itself is fixed, see
/// [`MAX_ATTEMPTS`](crate::analysis::MAX_ATTEMPTS).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Delay before the first retry; doubles on every further retry
    pub base_delay_ms: u64,

    /// Upper bound for any single delay
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }
}

/// Photo cache garbage collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Photos older than this are eligible for deletion
    pub retention_hours: u64,

    /// Time between sweeps
    pub interval_hours: u64,

    /// UTC hour of day (0-23) the sweep cadence is anchored to
    pub anchor_hour: u32,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            retention_hours: 24,
            interval_hours: 24,
            anchor_hour: 3,
        }
    }
}

/// Health record settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Device time zone: "local" or an IANA name like "Europe/Berlin"
    pub timezone: String,

    /// Estimates above this many kilocalories are rejected as implausible
    pub max_calories: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            timezone: "local".to_string(),
            max_calories: 10_000.0,
        }
    }
}

/// Remote vision analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Messages API endpoint
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,

    /// Maximum tokens for the answer
    pub max_tokens: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            api_key: "${ANTHROPIC_API_KEY}".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 300,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
