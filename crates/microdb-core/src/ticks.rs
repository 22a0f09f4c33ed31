//! Tick encoding for timestamps and timespans.
//!
//! Both are persisted as 100-nanosecond ticks in an INTEGER column.
//! Timestamps count from 0001-01-01T00:00:00Z, which keeps files written
//! by older tooling readable.

use chrono::{DateTime, Duration, Utc};

/// Ticks per second.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Ticks between 0001-01-01T00:00:00Z and the Unix epoch.
pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// Converts a UTC timestamp to ticks, saturating at the i64 range.
#[must_use]
pub fn timestamp_to_ticks(value: &DateTime<Utc>) -> i64 {
    let sub = i64::from(value.timestamp_subsec_nanos()) / 100;
    value
        .timestamp()
        .saturating_mul(TICKS_PER_SECOND)
        .saturating_add(UNIX_EPOCH_TICKS)
        .saturating_add(sub)
}

/// Converts ticks back to a UTC timestamp.
///
/// Returns `None` when the value is outside chrono's representable range.
#[must_use]
pub fn ticks_to_timestamp(ticks: i64) -> Option<DateTime<Utc>> {
    let relative = ticks.checked_sub(UNIX_EPOCH_TICKS)?;
    let seconds = relative.div_euclid(TICKS_PER_SECOND);
    let nanos = u32::try_from(relative.rem_euclid(TICKS_PER_SECOND) * 100).ok()?;
    DateTime::from_timestamp(seconds, nanos)
}

/// Converts a timespan to ticks, saturating on overflow.
#[must_use]
pub fn duration_to_ticks(value: &Duration) -> i64 {
    value.num_microseconds().map_or_else(
        || {
            if value < &Duration::zero() {
                i64::MIN
            } else {
                i64::MAX
            }
        },
        |micros| {
            let sub = i64::from(value.subsec_nanos() % 1_000) / 100;
            micros.saturating_mul(10).saturating_add(sub)
        },
    )
}

/// Converts ticks back to a timespan.
#[must_use]
pub fn ticks_to_duration(ticks: i64) -> Duration {
    Duration::microseconds(ticks / 10) + Duration::nanoseconds((ticks % 10) * 100)
}
