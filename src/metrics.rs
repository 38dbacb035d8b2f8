use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LeadTimeError, Result};

/// Elapsed time between two instants, broken down in three units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeadTime {
    pub seconds: i64,
    pub minutes: f64,
    pub hours: f64,
}

/// Parses an ISO-8601 timestamp as a UTC instant.
///
/// Accepts RFC 3339 (`Z` or numeric offset), naive date-times which are taken
/// as UTC, and bare dates which resolve to midnight UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| LeadTimeError::InvalidTimestamp(value.to_string()))
}

/// Computes `to - from`.
///
/// Seconds are truncated toward zero, minutes and hours are rounded to two
/// decimals with ties to even. Negative durations are reported as is.
pub fn duration(from: &str, to: &str) -> Result<LeadTime> {
    let start = parse_timestamp(from)?;
    let end = parse_timestamp(to)?;
    let delta = end - start;

    #[allow(clippy::cast_precision_loss)]
    let total_seconds = delta
        .num_nanoseconds()
        .map_or(delta.num_seconds() as f64, |nanos| nanos as f64 / 1e9);

    Ok(LeadTime {
        seconds: delta.num_seconds(),
        minutes: round_2dp(total_seconds / 60.0),
        hours: round_2dp(total_seconds / 3600.0),
    })
}

fn round_2dp(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
