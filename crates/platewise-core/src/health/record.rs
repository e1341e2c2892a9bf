//! Building health records from capture instants.

use crate::error::Fault;
use crate::types::{HealthRecord, NutritionEstimate};
use chrono::{DateTime, FixedOffset, Local, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use std::fmt;
use std::str::FromStr;

/// Where the device's UTC offset comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceTimeZone {
    /// The host's local zone
    Local,
    /// A fixed IANA zone
    Named(Tz),
}

impl DeviceTimeZone {
    /// Offset in effect at `instant`, not at the time of the call.
    pub fn offset_at(&self, instant: DateTime<Utc>) -> FixedOffset {
        match self {
            DeviceTimeZone::Local => Local.offset_from_utc_datetime(&instant.naive_utc()).fix(),
            DeviceTimeZone::Named(tz) => tz.offset_from_utc_datetime(&instant.naive_utc()).fix(),
        }
    }
}

impl FromStr for DeviceTimeZone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("local") {
            return Ok(DeviceTimeZone::Local);
        }
        s.parse::<Tz>()
            .map(DeviceTimeZone::Named)
            .map_err(|_| format!("unknown time zone {s:?}"))
    }
}

impl fmt::Display for DeviceTimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceTimeZone::Local => f.write_str("local"),
            DeviceTimeZone::Named(tz) => write!(f, "{}", tz.name()),
        }
    }
}

/// Reject estimates that can't describe a real meal.
pub fn validate_estimate(estimate: &NutritionEstimate, max_calories: f64) -> Result<(), Fault> {
    let c = estimate.calories;
    if !c.is_finite() || c < 0.0 || c > max_calories {
        return Err(Fault::OutOfRange {
            field: "calories".to_string(),
            value: c.to_string(),
        });
    }
    Ok(())
}

/// Build the record for a meal photographed at `captured_at`.
///
/// The meal is recorded as an instant (start == end) with the offset the
/// device zone had at that moment.
pub fn build_record(
    estimate: &NutritionEstimate,
    captured_at: DateTime<Utc>,
    zone: &DeviceTimeZone,
) -> HealthRecord {
    HealthRecord {
        id: None,
        calories: estimate.calories,
        description: estimate.description.clone(),
        start_time: captured_at,
        end_time: captured_at,
        utc_offset_seconds: zone.offset_at(captured_at).local_minus_utc(),
    }
}
