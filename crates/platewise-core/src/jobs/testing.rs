//! Scripted collaborators shared by the job, dispatcher and facade tests.

use crate::analysis::{ExternalAnalysisClient, PhotoInput};
use crate::error::Fault;
use crate::types::NutritionEstimate;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

type ResponseFn = Box<dyn Fn(u32) -> Result<NutritionEstimate, Fault> + Send + Sync>;

/// Mock analyzer whose answer depends on the call index.
pub(crate) struct MockAnalyzer {
    response_fn: ResponseFn,
    call_count: Arc<AtomicU32>,
    call_times: Arc<Mutex<Vec<Instant>>>,
    delay: Option<Duration>,
}

pub(crate) fn estimate(calories: f64) -> NutritionEstimate {
    NutritionEstimate {
        calories,
        description: "chicken salad".to_string(),
    }
}

impl MockAnalyzer {
    pub(crate) fn new<F>(f: F) -> Self
    where
        F: Fn(u32) -> Result<NutritionEstimate, Fault> + Send + Sync + 'static,
    {
        Self {
            response_fn: Box::new(f),
            call_count: Arc::new(AtomicU32::new(0)),
            call_times: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    pub(crate) fn success(calories: f64) -> Self {
        Self::new(move |_| Ok(estimate(calories)))
    }

    pub(crate) fn failing<F>(fault: F) -> Self
    where
        F: Fn() -> Fault + Send + Sync + 'static,
    {
        Self::new(move |_| Err(fault()))
    }

    /// Fail the first `failures` calls, then succeed.
    pub(crate) fn fail_then_succeed<F>(failures: u32, fault: F) -> Self
    where
        F: Fn() -> Fault + Send + Sync + 'static,
    {
        Self::new(move |idx| {
            if idx < failures {
                Err(fault())
            } else {
                Ok(estimate(480.0))
            }
        })
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn call_count_handle(&self) -> Arc<AtomicU32> {
        self.call_count.clone()
    }

    pub(crate) fn call_times_handle(&self) -> Arc<Mutex<Vec<Instant>>> {
        self.call_times.clone()
    }
}

#[async_trait]
impl ExternalAnalysisClient for MockAnalyzer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn analyze(&self, _photo: &PhotoInput) -> Result<NutritionEstimate, Fault> {
        let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
        self.call_times.lock().unwrap().push(Instant::now());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.response_fn)(idx)
    }
}
