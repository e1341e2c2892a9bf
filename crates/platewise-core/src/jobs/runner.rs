//! Drives one [`AnalysisJob`] from `Pending` to a terminal state.
//!
//! Each attempt reads the photo, calls the analysis service, validates the
//! estimate and writes the record. A failure anywhere in that chain is
//! classified once and the kind alone decides what happens next.

use super::job::{AnalysisJob, JobState};
use crate::analysis::{classify, ErrorKind, ExternalAnalysisClient, PhotoInput, RetryPolicy};
use crate::config::Config;
use crate::error::Fault;
use crate::health::{build_record, validate_estimate, DeviceTimeZone, HealthDataSink};
use crate::notify::{AlertContext, NotificationDispatcher};
use crate::store::ResourceStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Final result of a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobOutcome {
    pub photo_id: String,
    pub state: JobState,
    /// Retries performed before the job ended
    pub retries: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    pub photo_retained: bool,
    pub alerted: bool,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        self.state == JobState::Succeeded
    }
}

/// Runs analysis jobs against a fixed set of collaborators.
pub struct JobRunner {
    store: ResourceStore,
    analyzer: Arc<dyn ExternalAnalysisClient>,
    sink: Arc<dyn HealthDataSink>,
    notifier: Arc<NotificationDispatcher>,
    policy: RetryPolicy,
    zone: DeviceTimeZone,
    analysis_timeout: Duration,
    max_calories: f64,
}

impl JobRunner {
    pub fn new(
        store: ResourceStore,
        analyzer: Arc<dyn ExternalAnalysisClient>,
        sink: Arc<dyn HealthDataSink>,
        notifier: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            store,
            analyzer,
            sink,
            notifier,
            policy: RetryPolicy::default(),
            zone: DeviceTimeZone::Local,
            analysis_timeout: Duration::from_secs(60),
            max_calories: 10_000.0,
        }
    }

    /// Apply retry, time zone, timeout and validation settings from config.
    pub fn configured(mut self, config: &Config, zone: DeviceTimeZone) -> Self {
        self.policy = RetryPolicy::from_config(&config.retry);
        self.zone = zone;
        self.analysis_timeout = config.analysis_timeout();
        self.max_calories = config.health.max_calories;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_time_zone(mut self, zone: DeviceTimeZone) -> Self {
        self.zone = zone;
        self
    }

    pub fn with_analysis_timeout(mut self, timeout: Duration) -> Self {
        self.analysis_timeout = timeout;
        self
    }

    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    pub fn notifier(&self) -> &NotificationDispatcher {
        &self.notifier
    }

    /// Run `job` to completion.
    ///
    /// A worker slot from `gate` is held only while an attempt is in flight;
    /// it is released during backoff. `observe` sees every state entered.
    /// Returns `None` if the gate was closed (shutdown) before the job
    /// finished; the photo is left untouched in that case.
    pub async fn run<F>(&self, mut job: AnalysisJob, gate: &Semaphore, observe: F) -> Option<JobOutcome>
    where
        F: Fn(JobState),
    {
        loop {
            let permit = match gate.acquire().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::info!(
                        photo_id = job.photo_id(),
                        attempt = job.attempt(),
                        "Dispatcher closed; abandoning job, photo kept"
                    );
                    return None;
                }
            };

            advance(&mut job, JobState::InFlight, None, &observe);
            let result = self.attempt(&job).await;
            drop(permit);

            let fault = match result {
                Ok(record_id) => {
                    advance(&mut job, JobState::Succeeded, None, &observe);
                    self.release_photo(job.photo_id()).await;
                    return Some(JobOutcome {
                        photo_id: job.photo_id().to_string(),
                        state: JobState::Succeeded,
                        retries: job.attempt(),
                        kind: None,
                        message: None,
                        record_id: Some(record_id),
                        photo_retained: false,
                        alerted: false,
                    });
                }
                Err(fault) => fault,
            };

            let kind = classify(&fault);
            tracing::debug!(
                photo_id = job.photo_id(),
                %kind,
                http_status = fault.http_status(),
                "Attempt failed"
            );

            let decision = self.policy.decide(kind, job.attempt());
            if decision.should_retry {
                advance(&mut job, JobState::Retrying, Some(kind), &observe);
                tracing::info!(
                    photo_id = job.photo_id(),
                    attempt = job.attempt(),
                    %kind,
                    delay_ms = decision.delay.as_millis() as u64,
                    "Retrying after backoff"
                );
                tokio::time::sleep(decision.delay).await;
                advance(&mut job, JobState::Pending, Some(kind), &observe);
                continue;
            }

            advance(&mut job, JobState::FailedTerminal, Some(kind), &observe);
            return Some(self.finish_failed(&job, kind).await);
        }
    }

    /// One pass through read → analyze → validate → insert.
    async fn attempt(&self, job: &AnalysisJob) -> Result<String, Fault> {
        let bytes = self.store.read(job.photo_id()).await?;
        let input = PhotoInput::from_bytes(&bytes);

        let estimate = match tokio::time::timeout(self.analysis_timeout, self.analyzer.analyze(&input)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(Fault::Timeout {
                    timeout_ms: self.analysis_timeout.as_millis() as u64,
                })
            }
        };

        validate_estimate(&estimate, self.max_calories)?;
        let record = build_record(&estimate, job.captured_at(), &self.zone);
        let record_id = self.sink.insert(&record).await?;

        tracing::info!(
            photo_id = job.photo_id(),
            record_id = %record_id,
            analyzer = self.analyzer.name(),
            calories = estimate.calories,
            utc_offset_seconds = record.utc_offset_seconds,
            "Health record written"
        );
        Ok(record_id)
    }

    /// Apply the per-kind side effects of a terminal failure.
    async fn finish_failed(&self, job: &AnalysisJob, kind: ErrorKind) -> JobOutcome {
        let mut photo_retained = true;
        let mut alerted = false;

        match kind {
            ErrorKind::Validation => {
                // Nothing the user can fix and retrying won't help
                self.release_photo(job.photo_id()).await;
                photo_retained = false;
            }
            ErrorKind::Auth | ErrorKind::PermissionDenied => {
                let ctx = AlertContext {
                    photo_id: job.photo_id().to_string(),
                    attempt: job.attempt(),
                    captured_at: job.captured_at(),
                };
                alerted = self.notifier.notify(kind, &ctx).is_some();
            }
            ErrorKind::Network | ErrorKind::Server | ErrorKind::Parse | ErrorKind::RateLimit => {}
        }

        tracing::warn!(
            photo_id = job.photo_id(),
            %kind,
            attempt = job.attempt(),
            photo_retained,
            "Job failed: {}",
            kind.user_message()
        );

        JobOutcome {
            photo_id: job.photo_id().to_string(),
            state: JobState::FailedTerminal,
            retries: job.attempt(),
            kind: Some(kind),
            message: Some(kind.user_message()),
            record_id: None,
            photo_retained,
            alerted,
        }
    }

    async fn release_photo(&self, photo_id: &str) {
        if let Err(e) = self.store.delete(photo_id).await {
            tracing::warn!(photo_id, "Could not delete photo, leaving it for cleanup: {e}");
        }
    }
}

fn advance<F: Fn(JobState)>(job: &mut AnalysisJob, to: JobState, kind: Option<ErrorKind>, observe: &F) {
    match job.transition(to, kind) {
        Ok(()) => observe(to),
        Err(e) => tracing::error!("{e}"),
    }
}
