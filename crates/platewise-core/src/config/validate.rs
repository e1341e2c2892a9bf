//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.jobs.max_concurrent == 0 {
            return Err(ConfigError::ValidationError(
                "jobs.max_concurrent must be > 0".into(),
            ));
        }
        if self.jobs.analysis_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "jobs.analysis_timeout_ms must be > 0".into(),
            ));
        }
        if self.retry.base_delay_ms == 0 {
            return Err(ConfigError::ValidationError(
                "retry.base_delay_ms must be > 0".into(),
            ));
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(ConfigError::ValidationError(
                "retry.max_delay_ms must be >= retry.base_delay_ms".into(),
            ));
        }
        self.retention_window()?;
        self.cleanup_interval()?;
        if self.cleanup.anchor_hour > 23 {
            return Err(ConfigError::ValidationError(
                "cleanup.anchor_hour must be between 0 and 23".into(),
            ));
        }
        if !self.health.max_calories.is_finite() || self.health.max_calories <= 0.0 {
            return Err(ConfigError::ValidationError(
                "health.max_calories must be a positive number".into(),
            ));
        }
        self.time_zone()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.jobs.max_concurrent = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_concurrent"));
    }

    #[test]
    fn test_validate_rejects_inverted_delays() {
        let mut config = Config::default();
        config.retry.base_delay_ms = 5_000;
        config.retry.max_delay_ms = 1_000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_delay_ms"));
    }

    #[test]
    fn test_validate_rejects_oversized_cleanup_hours() {
        let mut config = Config::default();
        config.cleanup.retention_hours = u64::MAX;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("retention_hours"));

        let mut config = Config::default();
        config.cleanup.interval_hours = 10_000_000_000_000_000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("interval_hours"));

        let mut config = Config::default();
        config.cleanup.retention_hours = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_anchor_hour() {
        let mut config = Config::default();
        config.cleanup.anchor_hour = 24;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("anchor_hour"));
    }

    #[test]
    fn test_validate_rejects_unknown_timezone() {
        let mut config = Config::default();
        config.health.timezone = "Mars/Olympus_Mons".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("health.timezone"));
    }

    #[test]
    fn test_validate_rejects_non_positive_max_calories() {
        let mut config = Config::default();
        config.health.max_calories = 0.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_calories"));

        config.health.max_calories = f64::NAN;
        assert!(config.validate().is_err());
    }
}
