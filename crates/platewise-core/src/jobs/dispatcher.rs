//! Background execution of analysis jobs.
//!
//! Each submitted photo gets its own tokio task. A shared semaphore bounds
//! how many attempts are in flight at once; jobs waiting out a backoff do
//! not hold a slot.

use super::job::{AnalysisJob, JobState};
use super::registry::JobRegistry;
use super::runner::{JobOutcome, JobRunner};
use crate::error::DispatchError;
use crate::types::PhotoResource;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Handle to a submitted job.
#[derive(Debug)]
pub struct JobHandle {
    photo_id: String,
    handle: JoinHandle<Option<JobOutcome>>,
}

impl JobHandle {
    pub fn photo_id(&self) -> &str {
        &self.photo_id
    }

    /// Wait for the job to finish.
    ///
    /// `None` means the job never reached a terminal state (shutdown or abort).
    pub async fn wait(self) -> Option<JobOutcome> {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => None,
            Err(e) => {
                tracing::error!(photo_id = %self.photo_id, "Job task panicked: {e}");
                None
            }
        }
    }
}

/// Accepts photos and runs one job per photo in the background.
pub struct JobDispatcher {
    runner: Arc<JobRunner>,
    gate: Arc<Semaphore>,
    registry: JobRegistry,
}

impl JobDispatcher {
    pub fn new(runner: JobRunner, max_concurrent: usize) -> Self {
        Self {
            runner: Arc::new(runner),
            gate: Arc::new(Semaphore::new(max_concurrent.max(1))),
            registry: JobRegistry::new(),
        }
    }

    /// Start a job for `photo`.
    ///
    /// Fails if the dispatcher is shut down or a job for the same photo is
    /// still active. Must be called from within a tokio runtime.
    pub fn submit(&self, photo: &PhotoResource) -> Result<JobHandle, DispatchError> {
        if self.gate.is_closed() {
            return Err(DispatchError::ShutDown);
        }
        let claim = self
            .registry
            .try_claim(&photo.id)
            .ok_or_else(|| DispatchError::AlreadyActive(photo.id.clone()))?;

        let job = AnalysisJob::new(photo);
        let runner = self.runner.clone();
        let gate = self.gate.clone();
        let registry = self.registry.clone();

        let handle = tokio::spawn(async move {
            let claim = claim;
            let photo_id = claim.photo_id().to_string();
            runner
                .run(job, &gate, |state| registry.set_state(&photo_id, state))
                .await
        });
        self.registry.set_abort(&photo.id, handle.abort_handle());

        tracing::debug!(photo_id = %photo.id, "Job submitted");
        Ok(JobHandle {
            photo_id: photo.id.clone(),
            handle,
        })
    }

    /// Start a new job for a photo that is still in the store, typically
    /// after the user fixed whatever made the previous job fail.
    pub async fn resubmit(&self, photo_id: &str) -> Result<JobHandle, DispatchError> {
        let photo = self.runner.store().get(photo_id).await?;
        self.submit(&photo)
    }

    /// State of the active job for `photo_id`, if there is one.
    pub fn state_of(&self, photo_id: &str) -> Option<JobState> {
        self.registry.state_of(photo_id)
    }

    pub fn active_ids(&self) -> Vec<String> {
        self.registry.active_ids()
    }

    /// The registry of active jobs, shared with cleanup.
    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn runner(&self) -> &JobRunner {
        &self.runner
    }

    /// Stop accepting work and abandon waiting jobs.
    ///
    /// Jobs that are pending or backing off are aborted and leave their
    /// photos in the store for a later resubmit or for cleanup. An attempt
    /// already in flight runs to the end of that attempt; if it fails, the
    /// closed gate stops the job before another one starts.
    pub fn shutdown(&self) {
        self.gate.close();
        let aborted = self.registry.abort_waiting();
        tracing::info!(aborted, "Job dispatcher shut down");
    }
}
