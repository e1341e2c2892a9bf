//! The `platewise cache` command for inspecting and reclaiming the photo store.

use clap::{Args, Subcommand};
use platewise_core::{CacheStats, CleanupScheduler, Config, ResourceStore};

/// Arguments for the `cache` command.
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

/// Subcommands for the photo cache.
#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show how many photos are waiting and how much space they use
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete photos older than the retention window now
    Sweep {
        /// Override cleanup.retention_hours for this sweep
        #[arg(long)]
        retention_hours: Option<u64>,
    },
}

/// Execute the cache command.
pub async fn execute(args: CacheArgs, mut config: Config) -> anyhow::Result<()> {
    let store = ResourceStore::open(config.photo_dir()).await?;

    match args.command {
        CacheCommand::Stats { json } => {
            let stats = store.stats().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_stats(&stats);
            }
        }

        CacheCommand::Sweep { retention_hours } => {
            apply_retention_override(&mut config, retention_hours)?;
            let report = CleanupScheduler::from_config(store, &config)?.sweep().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

/// Replace the configured retention for a one-off sweep, rejecting values
/// the config file itself would not accept.
fn apply_retention_override(config: &mut Config, hours: Option<u64>) -> anyhow::Result<()> {
    if let Some(hours) = hours {
        config.cleanup.retention_hours = hours;
        config.retention_window()?;
    }
    Ok(())
}

fn print_stats(stats: &CacheStats) {
    println!("Photos:  {}", stats.photo_count);
    println!("Size:    {}", format_bytes(stats.total_size_bytes));
    match stats.oldest_photo_age_hours {
        Some(hours) => println!("Oldest:  {hours}h"),
        None => println!("Oldest:  -"),
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retention_override_is_range_checked() {
        let mut config = Config::default();
        apply_retention_override(&mut config, None).unwrap();
        assert_eq!(config.cleanup.retention_hours, 24);

        apply_retention_override(&mut config, Some(72)).unwrap();
        assert_eq!(config.cleanup.retention_hours, 72);

        assert!(apply_retention_override(&mut config, Some(u64::MAX)).is_err());
        assert!(apply_retention_override(&mut config, Some(0)).is_err());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024 + 512 * 1024), "5.5 MiB");
    }
}
