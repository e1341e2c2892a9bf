//! The `platewise config` command: inspect and bootstrap configuration.

use clap::{Args, Subcommand};
use platewise_core::Config;
use std::fmt::Write as _;

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display the effective configuration and the paths it resolves to
    Show {
        /// Print only the resolved paths and durations
        #[arg(long)]
        resolved: bool,
    },

    /// Show config file path
    Path,

    /// Write a default config file and create the photo directory
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

/// Execute the config command.
pub async fn execute(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show { resolved } => {
            // Load again so validation errors surface here instead of the default fallback
            let config = Config::load()?;
            if !resolved {
                println!("{}", config.to_toml()?);
            }
            print!("{}", resolved_summary(&config)?);
        }

        ConfigCommand::Path => {
            println!("{}", Config::default_path().display());
        }

        ConfigCommand::Init { force } => {
            let path = Config::default_path();
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at: {}\nUse --force to overwrite.",
                    path.display()
                );
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let config = Config::default();
            std::fs::write(&path, config.to_toml()?)?;
            std::fs::create_dir_all(config.photo_dir())?;

            tracing::info!(photo_dir = %config.photo_dir().display(), "Config file created at: {}", path.display());
            println!("Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

/// Where the pipeline will keep its data and how cleanup will behave,
/// as resolved from `config`. Fails on values the pipeline would reject.
fn resolved_summary(config: &Config) -> anyhow::Result<String> {
    let zone = config.time_zone()?;
    let retention = config.retention_window()?;
    let interval = config.cleanup_interval()?;
    let photo_dir = config.photo_dir();

    let mut out = String::new();
    writeln!(out, "# Resolved")?;
    writeln!(
        out,
        "photo_dir      = {}{}",
        photo_dir.display(),
        if photo_dir.is_dir() { "" } else { " (not created yet)" }
    )?;
    writeln!(out, "journal_path   = {}", config.journal_path().display())?;
    writeln!(out, "time_zone      = {zone}")?;
    writeln!(out, "retention      = {}h", retention.num_hours())?;
    writeln!(
        out,
        "sweep          = every {}h from {:02}:00 UTC",
        interval.num_hours(),
        config.cleanup.anchor_hour
    )?;
    writeln!(out, "max_concurrent = {}", config.jobs.max_concurrent)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_resolved_summary_lists_paths_and_schedule() {
        let mut config = Config::default();
        config.general.data_dir = PathBuf::from("/nonexistent/platewise");
        config.cleanup.retention_hours = 48;
        config.health.timezone = "Europe/Berlin".to_string();

        let summary = resolved_summary(&config).unwrap();
        assert!(summary.contains("photo_dir      = /nonexistent/platewise/photos (not created yet)"));
        assert!(summary.contains("journal_path   = /nonexistent/platewise/health.jsonl"));
        assert!(summary.contains("time_zone      = Europe/Berlin"));
        assert!(summary.contains("retention      = 48h"));
        assert!(summary.contains("every 24h from 03:00 UTC"));
    }

    #[test]
    fn test_resolved_summary_rejects_out_of_range_retention() {
        let mut config = Config::default();
        config.cleanup.retention_hours = u64::MAX;
        assert!(resolved_summary(&config).is_err());
    }
}
