//! Platewise CLI - background nutrition analysis for meal photos.
//!
//! Imports meal photos, sends them to a vision model for a calorie estimate,
//! and records the result in a local health journal. Failed photos stay in
//! the cache until resubmitted or swept.
//!
//! # Usage
//!
//! ```bash
//! # Analyze photos (one JSON outcome per line on stdout)
//! platewise analyze lunch.jpg dinner.jpg
//!
//! # Retry a photo kept after a failure
//! platewise resubmit 3f2a9c...
//!
//! # Inspect or sweep the photo cache
//! platewise cache stats
//! platewise cache sweep
//!
//! # Run scheduled cleanup until Ctrl-C
//! platewise daemon
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Platewise - background nutrition analysis for meal photos.
#[derive(Parser, Debug)]
#[command(name = "platewise")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze meal photos and record their nutrition
    Analyze(cli::analyze::AnalyzeArgs),

    /// Retry a photo still held in the cache
    Resubmit(cli::analyze::ResubmitArgs),

    /// Inspect or reclaim the photo cache
    Cache(cli::cache::CacheArgs),

    /// Run scheduled cache cleanup until interrupted
    Daemon(cli::daemon::DaemonArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match platewise_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `platewise config path`."
            );
            platewise_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("platewise v{}", platewise_core::VERSION);

    match cli.command {
        Commands::Analyze(args) => cli::analyze::execute(args, config).await,
        Commands::Resubmit(args) => cli::analyze::resubmit(args, config).await,
        Commands::Cache(args) => cli::cache::execute(args, config).await,
        Commands::Daemon(args) => cli::daemon::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
