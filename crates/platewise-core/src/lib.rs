//! Platewise Core - background nutrition analysis for meal photos.
//!
//! A captured meal photo is stored locally, sent to a remote vision service
//! for a calorie estimate, and written to the device health store. Failures
//! are classified once, retried only when transient, and surfaced to the
//! user only when the user can do something about them.
//!
//! # Architecture
//!
//! ```text
//! capture → ResourceStore → AnalysisJob ─┬─ analyze ─ validate ─ insert → delete photo
//!                                        ├─ Network/Server: back off, retry
//!                                        └─ terminal: delete or keep photo, maybe alert
//! CleanupScheduler (daily) → delete photos older than the retention window
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use platewise_core::{AnthropicAnalyzer, Config, JournalHealthSink, LogAlertSink, Platewise};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> platewise_core::Result<()> {
//!     let config = Config::load()?;
//!     let analyzer = AnthropicAnalyzer::from_config(&config.analysis, config.analysis_timeout())
//!         .expect("API key");
//!     let sink = JournalHealthSink::new(config.journal_path());
//!     let platewise =
//!         Platewise::new(config, Arc::new(analyzer), Arc::new(sink), Arc::new(LogAlertSink)).await?;
//!
//!     let job = platewise.analyze_file("./lunch.jpg".as_ref()).await?;
//!     println!("{:?}", job.wait().await);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod analysis;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod health;
pub mod jobs;
pub mod notify;
pub mod store;
pub mod types;

// Re-exports for convenient access
pub use analysis::{
    classify, is_retryable, user_message, AnthropicAnalyzer, ErrorKind, ExternalAnalysisClient,
    PhotoInput, RetryDecision, RetryPolicy, MAX_ATTEMPTS,
};
pub use cleanup::{CleanupScheduler, SweepReport};
pub use config::Config;
pub use error::{
    ConfigError, DispatchError, Fault, JobError, PlatewiseError, Result, StoreError, StoreResult,
};
pub use health::{
    update_record, DeviceTimeZone, HealthDataSink, JournalHealthSink, MemoryHealthSink,
    UpdateError,
};
pub use jobs::{AnalysisJob, JobDispatcher, JobHandle, JobOutcome, JobRunner, JobState};
pub use notify::{
    Alert, AlertEvent, AlertSink, ChannelAlertSink, LogAlertSink, NotificationDispatcher,
    RecoveryAction,
};
pub use store::ResourceStore;
pub use types::{CacheStats, HealthRecord, NutritionEstimate, PhotoResource, TimeRange};

use chrono::Utc;
use std::path::Path;
use std::sync::Arc;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The wired pipeline: store, job dispatcher, notifications and cleanup,
/// built from a [`Config`] plus the host's collaborators.
pub struct Platewise {
    config: Config,
    store: ResourceStore,
    dispatcher: JobDispatcher,
    cleanup: CleanupScheduler,
    notifier: Arc<NotificationDispatcher>,
}

impl Platewise {
    /// Open the photo store and wire every component.
    pub async fn new(
        config: Config,
        analyzer: Arc<dyn ExternalAnalysisClient>,
        sink: Arc<dyn HealthDataSink>,
        alerts: Arc<dyn AlertSink>,
    ) -> Result<Self> {
        tracing::debug!("Initializing platewise v{}", VERSION);
        let zone = config.time_zone()?;
        let store = ResourceStore::open(config.photo_dir()).await?;
        let notifier = Arc::new(NotificationDispatcher::new(alerts));

        let runner = JobRunner::new(store.clone(), analyzer, sink, notifier.clone())
            .configured(&config, zone);
        let dispatcher = JobDispatcher::new(runner, config.jobs.max_concurrent);
        let cleanup = CleanupScheduler::from_config(store.clone(), &config)?
            .with_registry(dispatcher.registry().clone());

        Ok(Self {
            config,
            store,
            dispatcher,
            cleanup,
            notifier,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    pub fn dispatcher(&self) -> &JobDispatcher {
        &self.dispatcher
    }

    pub fn cleanup(&self) -> &CleanupScheduler {
        &self.cleanup
    }

    /// Store freshly captured photo bytes and start analyzing them.
    pub async fn capture(&self, bytes: &[u8]) -> Result<JobHandle> {
        let photo = self.store.create(bytes, Utc::now()).await?;
        Ok(self.dispatcher.submit(&photo)?)
    }

    /// Import a photo file and start analyzing it.
    pub async fn analyze_file(&self, path: &Path) -> Result<JobHandle> {
        let photo = self.store.import(path).await?;
        Ok(self.dispatcher.submit(&photo)?)
    }

    /// Retry a photo still held in the store.
    pub async fn resubmit(&self, photo_id: &str) -> Result<JobHandle> {
        Ok(self.dispatcher.resubmit(photo_id).await?)
    }

    /// Dismiss an alert without retrying anything.
    pub fn dismiss_alert(&self, alert_id: &str) {
        self.notifier.dismiss(alert_id);
    }

    pub async fn cache_stats(&self) -> Result<CacheStats> {
        Ok(self.store.stats().await?)
    }

    /// Stop the dispatcher. Photos of unfinished jobs stay in the store.
    pub fn shutdown(&self) {
        self.dispatcher.shutdown();
    }
}
