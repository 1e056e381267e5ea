//! Line-by-line qualification of committed capacity.
//!
//! Every order is split into discrete capacity lines. Each line in turn drains
//! up to one `increment` from every utilized hour of the order's `updates`
//! table, then is judged: it qualifies when the savings it earned cover the
//! penalty for its unused hours.

use chrono::{DateTime, Datelike, NaiveDateTime, Utc};

use crate::error::Result;
use crate::order::Order;
use crate::time::HOUR_LABEL_FORMAT;

/// Slack applied when converting the line count to an integer.
const ITERATION_EPSILON: f64 = 1e-9;

/// Split a commitment into `(iterations, increment)`.
///
/// Fractional sizes keep one line per instance of size `factor`. Sizes with a
/// factor above 1 are split into lines of exactly one normalized unit.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn increment_and_iterations(units_per_hour: f64, factor: f64) -> (u64, f64) {
    if factor <= 0.0 || units_per_hour <= 0.0 {
        return (0, factor.max(0.0));
    }

    let mut iterations = units_per_hour / factor;
    let mut increment = factor;

    if increment > 1.0 {
        iterations *= increment;
        increment = 1.0;
    }

    ((iterations + ITERATION_EPSILON).floor() as u64, increment)
}

/// Number of days of the current month that count toward the penalty.
///
/// While the cutoff lies strictly inside the commitment only the days before it
/// count, otherwise the whole month up to the commitment's end day does.
fn current_month_days(order: &Order, cutoff: DateTime<Utc>) -> f64 {
    let config = &order.config;
    let days = if cutoff > config.start_date && cutoff < config.end_date {
        cutoff.day().saturating_sub(1)
    } else {
        config.end_date.day()
    };
    f64::from(days)
}

/// Whether a `(day, hour)` entry is a valid possible hour: strictly before the
/// cutoff and not after the commitment end. Unreadable keys never are.
fn counts_toward_month(
    day: &str,
    hour: &str,
    cutoff: DateTime<Utc>,
    end: DateTime<Utc>,
) -> bool {
    NaiveDateTime::parse_from_str(&format!("{day} {hour}:00"), HOUR_LABEL_FORMAT)
        .map(|naive| naive.and_utc())
        .is_ok_and(|instant| instant < cutoff && instant <= end)
}

/// Qualify every order of a group against its freshly allocated `updates`.
///
/// Resets and recomputes the month-to-date aggregates of each order. The
/// `updates` tables are drained in the process; entries at or after the cutoff
/// are left alone.
///
/// # Errors
///
/// Returns `AttributionError::MissingField` if an order lacks normalized units
/// or pricing.
pub fn qualify(orders: &mut [Order], cutoff: DateTime<Utc>, hours_per_day: f64) -> Result<()> {
    for order in orders.iter_mut() {
        let units = order.require_normalized_units()?;
        let pricing = order.require_pricing()?;
        let month_days = current_month_days(order, cutoff);
        let (iterations, increment) = increment_and_iterations(units.units_per_hour, units.factor);
        let line_hours = month_days * hours_per_day * increment;
        let end_date = order.config.end_date;

        let autopilot = order.autopilot_mut();
        autopilot.reset_month_to_date();

        for _ in 0..iterations {
            let mut hours_utilized = 0.0;
            for (day, hour, value) in autopilot.updates.entries_mut() {
                if *value > 0.0 && counts_toward_month(day, hour, cutoff, end_date) {
                    let consumed = value.min(increment);
                    *value = (*value - increment).max(0.0);
                    hours_utilized += consumed;
                }
            }

            let savings = pricing.savings_per_hour_normalized * hours_utilized;
            let penalty = pricing.flexible_normalized * (line_hours - hours_utilized);

            if savings >= penalty {
                autopilot.mtd_savings_at_rate += savings;
                autopilot.mtd_penalty_at_rate += penalty;
                autopilot.mtd_qualified_utilization += hours_utilized;
                autopilot.mtd_qualified_line_units += 1;
            } else {
                autopilot.mtd_discarded_savings_at_rate += savings;
                autopilot.mtd_discarded_penalty_at_rate += penalty;
                autopilot.mtd_unqualified_utilization += hours_utilized;
            }
        }
    }

    Ok(())
}
