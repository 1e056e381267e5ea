//! Time windowing helpers.
//!
//! All instants are UTC. Usage data lags real time, so the engine only trusts
//! hours strictly before the month-to-date cutoff.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

/// Label format of one hourly usage sample (`"2025-01-02 11:00"`).
pub const HOUR_LABEL_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Day key format of a utilization table.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Hour key format of a utilization table (`"00"`..`"23"`).
pub const HOUR_FORMAT: &str = "%H";

/// Compute the month-to-date cutoff for `now`.
///
/// The cutoff is midnight of `now` minus the usage-data delay. Samples at or after
/// the cutoff are not yet considered complete.
#[must_use]
pub fn month_to_date_cutoff(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    midnight(now) - delay
}

/// Truncate an instant to 00:00 of its day.
#[must_use]
pub fn midnight(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map_or(instant, |naive| naive.and_utc())
}

/// First day of the month containing `instant`.
#[must_use]
pub fn first_of_month(instant: DateTime<Utc>) -> NaiveDate {
    let date = instant.date_naive();
    date.with_day(1).unwrap_or(date)
}
