//! In-process health sink.
//!
//! Useful as a host default and in tests; failures can be injected per
//! operation to exercise the pipeline's error paths.

use super::sink::HealthDataSink;
use crate::error::Fault;
use crate::types::{HealthRecord, TimeRange};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

type FaultFactory = Box<dyn Fn() -> Fault + Send + Sync>;

#[derive(Default)]
struct Inner {
    records: HashMap<String, HealthRecord>,
    insert_failure: Option<FaultFactory>,
    delete_failure: Option<FaultFactory>,
    insert_calls: usize,
    delete_calls: usize,
}

/// Health sink that keeps records in memory.
#[derive(Default)]
pub struct MemoryHealthSink {
    inner: Mutex<Inner>,
}

impl MemoryHealthSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent insert fail with the produced fault.
    pub fn fail_inserts_with<F>(&self, fault: F)
    where
        F: Fn() -> Fault + Send + Sync + 'static,
    {
        self.lock().insert_failure = Some(Box::new(fault));
    }

    /// Make every subsequent delete fail with the produced fault.
    pub fn fail_deletes_with<F>(&self, fault: F)
    where
        F: Fn() -> Fault + Send + Sync + 'static,
    {
        self.lock().delete_failure = Some(Box::new(fault));
    }

    /// Stop injecting failures.
    pub fn clear_failures(&self) {
        let mut inner = self.lock();
        inner.insert_failure = None;
        inner.delete_failure = None;
    }

    /// Number of insert calls seen, including failed ones.
    pub fn insert_calls(&self) -> usize {
        self.lock().insert_calls
    }

    /// Number of delete calls seen, including failed ones.
    pub fn delete_calls(&self) -> usize {
        self.lock().delete_calls
    }

    /// Snapshot of all stored records, ordered by start time.
    pub fn records(&self) -> Vec<HealthRecord> {
        let mut records: Vec<_> = self.lock().records.values().cloned().collect();
        records.sort_by_key(|r| r.start_time);
        records
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl HealthDataSink for MemoryHealthSink {
    async fn insert(&self, record: &HealthRecord) -> Result<String, Fault> {
        let mut inner = self.lock();
        inner.insert_calls += 1;
        if let Some(fault) = &inner.insert_failure {
            return Err(fault());
        }
        let id = uuid::Uuid::new_v4().to_string();
        let stored = HealthRecord {
            id: Some(id.clone()),
            ..record.clone()
        };
        inner.records.insert(id.clone(), stored);
        Ok(id)
    }

    async fn delete(&self, id: &str) -> Result<(), Fault> {
        let mut inner = self.lock();
        inner.delete_calls += 1;
        if let Some(fault) = &inner.delete_failure {
            return Err(fault());
        }
        inner.records.remove(id);
        Ok(())
    }

    async fn query(&self, range: TimeRange) -> Result<Vec<HealthRecord>, Fault> {
        Ok(self
            .records()
            .into_iter()
            .filter(|r| range.contains(r.start_time))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn record_at(hour: u32) -> HealthRecord {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap();
        HealthRecord {
            id: None,
            calories: 200.0,
            description: "toast".to_string(),
            start_time: at,
            end_time: at,
            utc_offset_seconds: 0,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_ids_and_query_filters() {
        let sink = MemoryHealthSink::new();
        let a = sink.insert(&record_at(8)).await.unwrap();
        let b = sink.insert(&record_at(20)).await.unwrap();
        assert_ne!(a, b);

        let start = Utc.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap();
        let morning = sink
            .query(TimeRange::new(start, start + Duration::hours(6)))
            .await
            .unwrap();
        assert_eq!(morning.len(), 1);
        assert_eq!(morning[0].id.as_deref(), Some(a.as_str()));
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_ok() {
        let sink = MemoryHealthSink::new();
        sink.delete("nope").await.unwrap();
        assert_eq!(sink.delete_calls(), 1);
    }

    #[tokio::test]
    async fn test_injected_failures_and_clear() {
        let sink = MemoryHealthSink::new();
        sink.fail_inserts_with(|| Fault::PermissionDenied("health".into()));
        assert!(matches!(
            sink.insert(&record_at(9)).await,
            Err(Fault::PermissionDenied(_))
        ));
        sink.clear_failures();
        sink.insert(&record_at(9)).await.unwrap();
        assert_eq!(sink.insert_calls(), 2);
        assert_eq!(sink.records().len(), 1);
    }
}
