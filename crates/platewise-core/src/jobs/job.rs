//! The per-photo analysis job state machine.
//!
//! ```text
//! Pending ──▶ InFlight ──▶ Succeeded
//!    ▲           │
//!    │           ├──▶ FailedTerminal
//!    │           ▼
//!    └────── Retrying
//! ```
//!
//! `Succeeded` and `FailedTerminal` have no outgoing edges.

use crate::analysis::ErrorKind;
use crate::error::JobError;
use crate::types::PhotoResource;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an [`AnalysisJob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    InFlight,
    Retrying,
    Succeeded,
    FailedTerminal,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::FailedTerminal)
    }

    /// Whether `next` is an edge of the state machine from `self`.
    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Pending, InFlight)
                | (InFlight, Succeeded)
                | (InFlight, Retrying)
                | (InFlight, FailedTerminal)
                | (Retrying, Pending)
        )
    }
}

/// One recorded state change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub from: JobState,
    pub to: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    pub attempt: u32,
    pub at: DateTime<Utc>,
}

/// A single photo's trip through the pipeline.
///
/// `attempt` counts retries already scheduled: 0 during the first call,
/// incremented on every `Retrying -> Pending` edge.
#[derive(Debug, Clone)]
pub struct AnalysisJob {
    photo_id: String,
    attempt: u32,
    captured_at: DateTime<Utc>,
    state: JobState,
    history: Vec<Transition>,
}

impl AnalysisJob {
    pub fn new(photo: &PhotoResource) -> Self {
        Self {
            photo_id: photo.id.clone(),
            attempt: 0,
            captured_at: photo.created_at,
            state: JobState::Pending,
            history: Vec::new(),
        }
    }

    pub fn photo_id(&self) -> &str {
        &self.photo_id
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Every transition taken so far, oldest first.
    pub fn history(&self) -> &[Transition] {
        &self.history
    }

    /// The failure kind of the most recent failed attempt, if any.
    pub fn last_error(&self) -> Option<ErrorKind> {
        self.history.iter().rev().find_map(|t| t.kind)
    }

    /// Move to `to`, recording and logging the edge.
    pub fn transition(&mut self, to: JobState, kind: Option<ErrorKind>) -> Result<(), JobError> {
        let from = self.state;
        if !from.can_transition_to(to) {
            return Err(JobError::IllegalTransition {
                photo_id: self.photo_id.clone(),
                from,
                to,
            });
        }

        if from == JobState::Retrying && to == JobState::Pending {
            self.attempt += 1;
        }
        self.state = to;

        let at = Utc::now();
        tracing::info!(
            photo_id = %self.photo_id,
            from = ?from,
            to = ?to,
            kind = kind.map(ErrorKind::as_str).unwrap_or("none"),
            attempt = self.attempt,
            at = %at.to_rfc3339_opts(SecondsFormat::Millis, true),
            "Job transition"
        );

        self.history.push(Transition {
            from,
            to,
            kind,
            attempt: self.attempt,
            at,
        });
        Ok(())
    }
}
