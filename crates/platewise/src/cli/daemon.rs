//! The `platewise daemon` command: scheduled cleanup until Ctrl-C.

use clap::Args;
use platewise_core::{CleanupScheduler, Config, ResourceStore};
use tokio::sync::watch;

/// Arguments for the `daemon` command.
#[derive(Args, Debug)]
pub struct DaemonArgs {
    /// Run one sweep immediately before waiting for the schedule
    #[arg(long)]
    pub sweep_now: bool,
}

/// Execute the daemon command.
pub async fn execute(args: DaemonArgs, config: Config) -> anyhow::Result<()> {
    let store = ResourceStore::open(config.photo_dir()).await?;
    let scheduler = CleanupScheduler::from_config(store, &config)?;

    if args.sweep_now {
        scheduler.sweep().await;
    }
    tracing::info!(
        next_run = %scheduler.next_run_after(chrono::Utc::now()),
        "Daemon running; press Ctrl-C to stop"
    );

    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = tx.send(true);
            }
            Err(e) => {
                // Keep the sender alive so the scheduler keeps running
                tracing::error!("Failed to listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
        }
    });

    scheduler.run(rx).await;
    Ok(())
}
