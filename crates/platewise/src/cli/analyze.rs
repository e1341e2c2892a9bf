//! The `platewise analyze` and `platewise resubmit` commands.

use clap::Args;
use platewise_core::{Config, JobHandle, JobOutcome, Platewise};
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the `analyze` command.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Meal photos to analyze
    #[arg(required = true)]
    pub photos: Vec<PathBuf>,

    /// Maximum analysis calls in flight (overrides jobs.max_concurrent)
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Pretty-print each outcome instead of one JSON object per line
    #[arg(long)]
    pub pretty: bool,
}

/// Arguments for the `resubmit` command.
#[derive(Args, Debug)]
pub struct ResubmitArgs {
    /// Id of a photo still held in the store
    pub photo_id: String,

    /// Pretty-print the outcome
    #[arg(long)]
    pub pretty: bool,
}

/// Execute the analyze command.
pub async fn execute(args: AnalyzeArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(parallel) = args.parallel {
        config.jobs.max_concurrent = parallel.max(1);
    }
    let platewise = Arc::new(super::build_pipeline(config).await?);
    let _interrupt = shutdown_on_ctrl_c(platewise.clone());

    let mut handles = Vec::with_capacity(args.photos.len());
    let mut failed = 0usize;
    for path in &args.photos {
        match platewise.analyze_file(path).await {
            Ok(handle) => {
                tracing::info!(photo_id = handle.photo_id(), path = %path.display(), "Queued photo");
                handles.push(handle);
            }
            Err(e) => {
                tracing::error!(path = %path.display(), "Could not queue photo: {e}");
                failed += 1;
            }
        }
    }

    let total = args.photos.len();
    let (succeeded, job_failures) = wait_all(handles, args.pretty).await?;
    failed += job_failures;

    tracing::info!("Analyzed {total} photos ({succeeded} saved, {failed} not saved)");
    if failed > 0 {
        anyhow::bail!("{failed} of {total} photos were not saved");
    }
    Ok(())
}

/// Execute the resubmit command.
pub async fn resubmit(args: ResubmitArgs, config: Config) -> anyhow::Result<()> {
    let platewise = Arc::new(super::build_pipeline(config).await?);
    let _interrupt = shutdown_on_ctrl_c(platewise.clone());

    let handle = platewise.resubmit(&args.photo_id).await?;
    let (_, failed) = wait_all(vec![handle], args.pretty).await?;
    if failed > 0 {
        anyhow::bail!("Photo {} was not saved", args.photo_id);
    }
    Ok(())
}

/// Wait for every job, printing each outcome as it is collected.
///
/// Returns `(succeeded, failed)`. Jobs cut short by Ctrl-C count as failed.
async fn wait_all(handles: Vec<JobHandle>, pretty: bool) -> anyhow::Result<(usize, usize)> {
    let mut succeeded = 0usize;
    let mut failed = 0usize;

    for handle in handles {
        let photo_id = handle.photo_id().to_string();
        match handle.wait().await {
            Some(outcome) => {
                print_outcome(&outcome, pretty)?;
                if outcome.is_success() {
                    succeeded += 1;
                } else {
                    failed += 1;
                }
            }
            None => {
                tracing::warn!(photo_id, "Job interrupted; photo kept for `platewise resubmit`");
                failed += 1;
            }
        }
    }

    Ok((succeeded, failed))
}

fn print_outcome(outcome: &JobOutcome, pretty: bool) -> anyhow::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(outcome)?
    } else {
        serde_json::to_string(outcome)?
    };
    println!("{json}");
    Ok(())
}

/// Shut the dispatcher down on Ctrl-C. Waiting jobs keep their photos;
/// an attempt already in flight is allowed to finish.
fn shutdown_on_ctrl_c(platewise: Arc<Platewise>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; stopping jobs");
            platewise.shutdown();
        }
    })
}
