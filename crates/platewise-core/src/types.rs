//! Core data types shared across the pipeline.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A captured photo held in the [`ResourceStore`](crate::store::ResourceStore).
///
/// Created once at capture time, read on every analysis attempt, deleted
/// exactly once (on success, on a non-retryable failure, or by cleanup).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoResource {
    /// Stable id; also the file stem inside the store
    pub id: String,

    /// Absolute path of the photo blob
    pub path: PathBuf,

    /// Capture instant
    pub created_at: DateTime<Utc>,

    /// Blob size in bytes
    pub size_bytes: u64,
}

impl PhotoResource {
    /// Age of the photo relative to `now`. Negative ages (clock skew) clamp to zero.
    pub fn age_at(&self, now: DateTime<Utc>) -> chrono::Duration {
        (now - self.created_at).max(chrono::Duration::zero())
    }
}

/// Nutrition estimate returned by the remote analysis service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionEstimate {
    /// Estimated energy in kilocalories
    pub calories: f64,

    /// Short description of the identified meal
    pub description: String,
}

/// A nutrition record as stored in the device health data store.
///
/// Times are kept in UTC alongside the offset that was in effect at the
/// capture instant, so the local wall-clock time can be reconstructed exactly
/// even across DST changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    /// Assigned by the sink on insert; `None` before the record is written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Energy in kilocalories
    pub calories: f64,

    /// Meal description
    pub description: String,

    /// Start of the meal interval
    pub start_time: DateTime<Utc>,

    /// End of the meal interval
    pub end_time: DateTime<Utc>,

    /// UTC offset in seconds at `start_time`
    pub utc_offset_seconds: i32,
}

impl HealthRecord {
    /// The UTC offset in effect at the capture instant.
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_seconds).unwrap_or_else(|| Utc.fix())
    }

    /// Start time as local wall-clock time.
    pub fn local_start(&self) -> NaiveDateTime {
        self.start_time.with_timezone(&self.utc_offset()).naive_local()
    }

    /// End time as local wall-clock time.
    pub fn local_end(&self) -> NaiveDateTime {
        self.end_time.with_timezone(&self.utc_offset()).naive_local()
    }
}

/// Half-open time range `[start, end)` used to query the health sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Whether `instant` falls inside the range.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }
}

/// Point-in-time snapshot of the photo cache. Recomputed on demand, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Sum of all photo blob sizes
    pub total_size_bytes: u64,

    /// Number of photos in the store
    pub photo_count: usize,

    /// Age of the oldest photo in whole hours, if any photo exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_photo_age_hours: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(offset_seconds: i32) -> HealthRecord {
        let start = Utc.with_ymd_and_hms(2024, 3, 10, 13, 0, 0).unwrap();
        HealthRecord {
            id: None,
            calories: 420.0,
            description: "oatmeal".to_string(),
            start_time: start,
            end_time: start,
            utc_offset_seconds: offset_seconds,
        }
    }

    #[test]
    fn test_local_start_applies_offset() {
        let rec = record(-4 * 3600);
        assert_eq!(rec.local_start().to_string(), "2024-03-10 09:00:00");
        assert_eq!(rec.local_end(), rec.local_start());
    }

    #[test]
    fn test_photo_age_clamps_future_timestamps() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let photo = PhotoResource {
            id: "a".into(),
            path: PathBuf::from("/tmp/a.photo"),
            created_at: now + chrono::Duration::hours(1),
            size_bytes: 1,
        };
        assert_eq!(photo.age_at(now), chrono::Duration::zero());
    }

    #[test]
    fn test_time_range_is_half_open() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = start + chrono::Duration::days(1);
        let range = TimeRange::new(start, end);
        assert!(range.contains(start));
        assert!(!range.contains(end));
    }

    #[test]
    fn test_health_record_id_omitted_when_absent() {
        let json = serde_json::to_string(&record(0)).unwrap();
        assert!(!json.contains("\"id\""));
    }
}
