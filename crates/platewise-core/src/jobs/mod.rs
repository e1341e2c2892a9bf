//! Analysis jobs: state machine, execution and dispatch.
//!
//! - **job**: the per-photo [`AnalysisJob`] state machine
//! - **runner**: drives one job through its attempts
//! - **registry**: which photos currently have an active job
//! - **dispatcher**: spawns jobs with bounded concurrency

mod dispatcher;
mod job;
mod registry;
mod runner;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatcher::{JobDispatcher, JobHandle};
pub use job::{AnalysisJob, JobState, Transition};
pub use registry::{Claim, JobRegistry};
pub use runner::{JobOutcome, JobRunner};
