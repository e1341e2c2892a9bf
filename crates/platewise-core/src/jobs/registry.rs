//! Tracks which photos currently have an active job.
//!
//! A photo is active from the moment it is claimed until its job task ends
//! (terminal state, shutdown or abort). At most one job per photo is active.

use super::job::JobState;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::AbortHandle;

#[derive(Debug)]
struct Entry {
    state: JobState,
    abort: Option<AbortHandle>,
}

/// Shared table of active jobs, keyed by photo id.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    inner: Arc<Mutex<HashMap<String, Entry>>>,
}

/// Exclusive claim on a photo. Releases the registry entry when dropped.
#[derive(Debug)]
pub struct Claim {
    registry: JobRegistry,
    photo_id: String,
}

impl Claim {
    pub fn photo_id(&self) -> &str {
        &self.photo_id
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.photo_id);
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `photo_id` for a new job, or `None` if one is already active.
    pub fn try_claim(&self, photo_id: &str) -> Option<Claim> {
        let mut map = self.lock();
        if map.contains_key(photo_id) {
            return None;
        }
        map.insert(
            photo_id.to_string(),
            Entry {
                state: JobState::Pending,
                abort: None,
            },
        );
        Some(Claim {
            registry: self.clone(),
            photo_id: photo_id.to_string(),
        })
    }

    /// Current state of the active job for `photo_id`.
    pub fn state_of(&self, photo_id: &str) -> Option<JobState> {
        self.lock().get(photo_id).map(|e| e.state)
    }

    pub fn is_active(&self, photo_id: &str) -> bool {
        self.lock().contains_key(photo_id)
    }

    /// Ids of all active jobs, sorted.
    pub fn active_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Record a state change. Ignored if the job is no longer active.
    pub fn set_state(&self, photo_id: &str, state: JobState) {
        if let Some(entry) = self.lock().get_mut(photo_id) {
            entry.state = state;
        }
    }

    /// Attach the task's abort handle. Ignored if the job already finished.
    pub fn set_abort(&self, photo_id: &str, abort: AbortHandle) {
        if let Some(entry) = self.lock().get_mut(photo_id) {
            entry.abort = Some(abort);
        }
    }

    /// Abort the tasks of jobs that are waiting (`Pending` or `Retrying`).
    /// Returns how many were signalled.
    ///
    /// `InFlight` jobs are left to finish their attempt so a written record
    /// is always followed by the photo delete.
    pub fn abort_waiting(&self) -> usize {
        // Aborted tasks drop their Claim, which takes the lock
        let handles: Vec<AbortHandle> = self
            .lock()
            .values()
            .filter(|e| matches!(e.state, JobState::Pending | JobState::Retrying))
            .filter_map(|e| e.abort.clone())
            .collect();
        for abort in &handles {
            abort.abort();
        }
        handles.len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
