//! Subcommand implementations for the `platewise` binary.

pub mod analyze;
pub mod cache;
pub mod config;
pub mod daemon;

use anyhow::Context;
use platewise_core::{AnthropicAnalyzer, Config, JournalHealthSink, LogAlertSink, Platewise};
use std::sync::Arc;

/// Wire the pipeline with the CLI's collaborators: Anthropic for analysis,
/// the JSON-lines journal as health store, and alerts written to the log.
pub(crate) async fn build_pipeline(config: Config) -> anyhow::Result<Platewise> {
    let analyzer = AnthropicAnalyzer::from_config(&config.analysis, config.analysis_timeout())
        .context(
            "No API key for the analysis service. Set ANTHROPIC_API_KEY or analysis.api_key \
             (see `platewise config path`).",
        )?;
    let sink = JournalHealthSink::new(config.journal_path());
    tracing::debug!(journal = %sink.path().display(), model = %config.analysis.model, "Pipeline wired");

    let platewise = Platewise::new(config, Arc::new(analyzer), Arc::new(sink), Arc::new(LogAlertSink))
        .await?;
    Ok(platewise)
}
