//! Periodic reclamation of abandoned photos.
//!
//! Photos normally leave the store when their job ends. Anything still there
//! after the retention window (failed jobs, restarts mid-retry, orphaned
//! blobs) is deleted by the sweep.

use crate::config::Config;
use crate::error::ConfigError;
use crate::jobs::JobRegistry;
use crate::store::ResourceStore;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

/// Summary of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub deleted_count: usize,
    pub bytes_reclaimed: u64,
    /// Deletes that failed and were skipped
    pub failed_count: usize,
    /// Expired photos left alone because a job still owns them
    pub skipped_active: usize,
    pub remaining_cache_bytes: u64,
    pub remaining_count: usize,
}

/// Deletes photos older than the retention window on a fixed daily cadence.
pub struct CleanupScheduler {
    store: ResourceStore,
    registry: Option<JobRegistry>,
    retention: Duration,
    interval: Duration,
    anchor_hour: u32,
}

impl CleanupScheduler {
    pub fn new(store: ResourceStore, retention: Duration) -> Self {
        Self {
            store,
            registry: None,
            retention,
            interval: Duration::hours(24),
            anchor_hour: 3,
        }
    }

    /// Fails if the retention or interval setting is out of range.
    pub fn from_config(store: ResourceStore, config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            store,
            registry: None,
            retention: config.retention_window()?,
            interval: config.cleanup_interval()?,
            anchor_hour: config.cleanup.anchor_hour.min(23),
        })
    }

    /// Never touch photos whose id is active in `registry`.
    pub fn with_registry(mut self, registry: JobRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_schedule(mut self, interval: Duration, anchor_hour: u32) -> Self {
        self.interval = interval;
        self.anchor_hour = anchor_hour.min(23);
        self
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    pub async fn sweep(&self) -> SweepReport {
        self.sweep_at(Utc::now()).await
    }

    /// Delete every photo older than the retention window as of `now`.
    ///
    /// Individual failures are logged and counted; the sweep itself
    /// always completes.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        let photos = match self.store.list_with_age(now).await {
            Ok(photos) => photos,
            Err(e) => {
                tracing::warn!("Cleanup could not enumerate photos: {e}");
                return report;
            }
        };

        for (photo, age) in photos {
            if age <= self.retention {
                report.remaining_count += 1;
                report.remaining_cache_bytes += photo.size_bytes;
                continue;
            }

            if self.registry.as_ref().is_some_and(|r| r.is_active(&photo.id)) {
                tracing::debug!(photo_id = %photo.id, "Skipping expired photo with an active job");
                report.skipped_active += 1;
                report.remaining_count += 1;
                report.remaining_cache_bytes += photo.size_bytes;
                continue;
            }

            match self.store.delete(&photo.id).await {
                Ok(Some(bytes)) => {
                    report.deleted_count += 1;
                    report.bytes_reclaimed += bytes;
                }
                // Gone already: a job finished between list and delete
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(photo_id = %photo.id, "Cleanup failed to delete photo: {e}");
                    report.failed_count += 1;
                    report.remaining_count += 1;
                    report.remaining_cache_bytes += photo.size_bytes;
                }
            }
        }

        tracing::info!(
            deleted_count = report.deleted_count,
            bytes_reclaimed = report.bytes_reclaimed,
            failed_count = report.failed_count,
            skipped_active = report.skipped_active,
            remaining_cache_bytes = report.remaining_cache_bytes,
            remaining_count = report.remaining_count,
            "Cleanup sweep complete"
        );
        report
    }

    /// The first scheduled run strictly after `now`.
    ///
    /// Runs fall on `anchor_hour:00 UTC` and every `interval` after it.
    pub fn next_run_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let anchor = NaiveTime::from_hms_opt(self.anchor_hour, 0, 0).unwrap_or(NaiveTime::MIN);
        // Yesterday's anchor is always at or before now
        let start = (now.date_naive() - Duration::days(1)).and_time(anchor).and_utc();
        let interval = self.interval.max(Duration::minutes(1));

        let elapsed = now - start;
        let steps = elapsed.num_seconds() / interval.num_seconds() + 1;
        start + interval * steps as i32
    }

    /// Sweep on schedule until `shutdown` turns true or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            retention_hours = self.retention.num_hours(),
            interval_hours = self.interval.num_hours(),
            anchor_hour = self.anchor_hour,
            "Cleanup scheduler started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            let now = Utc::now();
            let next = self.next_run_after(now);
            let wait = (next - now).to_std().unwrap_or_default();
            tracing::debug!(next_run = %next, "Next cleanup sweep scheduled");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    self.sweep().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Cleanup scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn store() -> (tempfile::TempDir, ResourceStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ResourceStore::open(dir.path().join("photos")).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_sweep_deletes_only_expired_photos() {
        let (_dir, store) = store().await;
        let now = Utc::now();
        store
            .create_with_id("stale", b"0123456789", now - Duration::hours(25))
            .await
            .unwrap();
        store
            .create_with_id("fresh", b"01234", now - Duration::hours(23))
            .await
            .unwrap();

        let scheduler = CleanupScheduler::new(store.clone(), Duration::hours(24));
        let report = scheduler.sweep_at(now).await;

        assert_eq!(
            report,
            SweepReport {
                deleted_count: 1,
                bytes_reclaimed: 10,
                failed_count: 0,
                skipped_active: 0,
                remaining_cache_bytes: 5,
                remaining_count: 1,
            }
        );
        let left: Vec<_> = store.list().await.unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(left, vec!["fresh".to_string()]);
    }

    #[tokio::test]
    async fn test_photo_exactly_at_window_is_kept() {
        let (_dir, store) = store().await;
        let now = Utc::now();
        store
            .create_with_id("edge", b"x", now - Duration::hours(24))
            .await
            .unwrap();

        let report = CleanupScheduler::new(store, Duration::hours(24)).sweep_at(now).await;
        assert_eq!(report.deleted_count, 0);
        assert_eq!(report.remaining_count, 1);
    }

    #[tokio::test]
    async fn test_sweep_skips_photos_with_active_jobs() {
        let (_dir, store) = store().await;
        let now = Utc::now();
        store
            .create_with_id("busy", b"abc", now - Duration::hours(48))
            .await
            .unwrap();
        store
            .create_with_id("idle", b"abc", now - Duration::hours(48))
            .await
            .unwrap();

        let registry = JobRegistry::new();
        let _claim = registry.try_claim("busy").unwrap();
        let scheduler =
            CleanupScheduler::new(store.clone(), Duration::hours(24)).with_registry(registry);

        let report = scheduler.sweep_at(now).await;
        assert_eq!(report.deleted_count, 1);
        assert_eq!(report.skipped_active, 1);
        assert!(store.get("busy").await.is_ok());
        assert!(store.get("idle").await.is_err());
    }

    #[tokio::test]
    async fn test_from_config_rejects_wrapping_retention() {
        let (_dir, store) = store().await;
        let now = Utc::now();
        store
            .create_with_id("recent", b"abc", now - Duration::hours(1))
            .await
            .unwrap();

        let mut config = Config::default();
        config.cleanup.retention_hours = u64::MAX;
        assert!(CleanupScheduler::from_config(store.clone(), &config).is_err());

        config.cleanup.retention_hours = 24;
        let scheduler = CleanupScheduler::from_config(store.clone(), &config).unwrap();
        assert_eq!(scheduler.sweep_at(now).await.deleted_count, 0);
        assert!(store.get("recent").await.is_ok());
    }

    #[tokio::test]
    async fn test_from_config_rejects_oversized_interval() {
        let (_dir, store) = store().await;
        let mut config = Config::default();
        config.cleanup.interval_hours = 10_000_000_000_000_000;
        assert!(CleanupScheduler::from_config(store, &config).is_err());
    }

    #[tokio::test]
    async fn test_sweep_on_empty_store() {
        let (_dir, store) = store().await;
        let report = CleanupScheduler::new(store, Duration::hours(24)).sweep().await;
        assert_eq!(report, SweepReport::default());
    }

    #[tokio::test]
    async fn test_orphan_blob_is_collected_once_expired() {
        let (_dir, store) = store().await;
        std::fs::write(store.root().join("orphan.photo"), b"abcd").unwrap();

        let scheduler = CleanupScheduler::new(store.clone(), Duration::hours(24));
        let report = scheduler.sweep_at(Utc::now() + Duration::hours(25)).await;
        assert_eq!(report.deleted_count, 1);
        assert_eq!(report.bytes_reclaimed, 4);
    }

    #[tokio::test]
    async fn test_next_run_uses_daily_anchor() {
        let (_dir, store) = store().await;
        let scheduler = CleanupScheduler::new(store, Duration::hours(24));

        let before = Utc.with_ymd_and_hms(2024, 6, 1, 1, 30, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 6, 1, 14, 0, 0).unwrap();
        let exact = Utc.with_ymd_and_hms(2024, 6, 1, 3, 0, 0).unwrap();

        assert_eq!(
            scheduler.next_run_after(before),
            Utc.with_ymd_and_hms(2024, 6, 1, 3, 0, 0).unwrap()
        );
        assert_eq!(
            scheduler.next_run_after(after),
            Utc.with_ymd_and_hms(2024, 6, 2, 3, 0, 0).unwrap()
        );
        assert_eq!(
            scheduler.next_run_after(exact),
            Utc.with_ymd_and_hms(2024, 6, 2, 3, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_next_run_with_shorter_interval() {
        let (_dir, store) = store().await;
        let scheduler = CleanupScheduler::new(store, Duration::hours(24))
            .with_schedule(Duration::hours(6), 0);

        let now = Utc.with_ymd_and_hms(2024, 6, 1, 13, 15, 0).unwrap();
        assert_eq!(
            scheduler.next_run_after(now),
            Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let (_dir, store) = store().await;
        let scheduler = CleanupScheduler::new(store, Duration::hours(24));
        let (tx, rx) = watch::channel(false);

        let task = tokio::spawn(async move { scheduler.run(rx).await });
        tokio::task::yield_now().await;
        tx.send(true).unwrap();
        task.await.unwrap();
    }
}
