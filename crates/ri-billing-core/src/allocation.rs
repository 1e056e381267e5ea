//! Hourly usage allocation across one allocation group.
//!
//! Each hour's aggregate usage is poured into the group's orders smallest
//! commitment first. Allocation works on scratch tables and only touches the
//! orders once the whole report has been consumed, so a failure leaves every
//! persisted `utilization` table as it was.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{debug, error, info, warn};

use crate::error::{AttributionError, Result};
use crate::group::AllocationGroupKey;
use crate::order::{NormalizedUnits, Order};
use crate::time::{DAY_FORMAT, HOUR_FORMAT};
use crate::usage::UsageReport;
use crate::utilization::UtilizationTable;

/// Time bounds of one allocation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationWindow {
    /// Month-to-date cutoff; samples at or after it are ignored.
    pub cutoff: DateTime<Utc>,

    /// Wall-clock time of the run.
    pub now: DateTime<Utc>,

    /// How far back zero-fill reaches once an order's window has closed.
    pub lookback: Duration,
}

/// Sort orders by `(units_per_hour, factor, id)` ascending.
pub fn sort_for_allocation(orders: &mut [Order]) {
    fn units(order: &Order) -> (f64, f64) {
        order
            .normalized_units
            .map_or((0.0, 0.0), |u| (u.units_per_hour, u.factor))
    }

    orders.sort_by(|a, b| {
        let (a_uph, a_factor) = units(a);
        let (b_uph, b_factor) = units(b);
        a_uph
            .total_cmp(&b_uph)
            .then_with(|| a_factor.total_cmp(&b_factor))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Distribute a group's usage report across its orders.
///
/// Sorts `orders` for allocation, rebuilds each order's `updates` table from its
/// persisted `utilization`, overlays the report (or zero-fills when the report
/// has no data) and finally copies `updates` back into `utilization`.
///
/// # Errors
///
/// Returns `AttributionError::MissingField` if an order has no normalized units
/// and `AttributionError::InvalidHourLabel` if a sample label cannot be parsed.
/// On error no order is modified beyond its position in the slice.
pub fn allocate(
    orders: &mut [Order],
    report: &UsageReport,
    window: &AllocationWindow,
    group: &AllocationGroupKey,
) -> Result<()> {
    sort_for_allocation(orders);

    let units = orders
        .iter()
        .map(Order::require_normalized_units)
        .collect::<Result<Vec<_>>>()?;

    let mut updates: Vec<UtilizationTable> = orders
        .iter()
        .map(|order| {
            order
                .autopilot
                .as_ref()
                .map(|autopilot| autopilot.utilization.clone())
                .unwrap_or_default()
        })
        .collect();

    if report.has_data() {
        distribute(orders, &units, report, window, group, &mut updates)?;
    } else {
        info!(group = %group, "Empty usage report, zero-filling eligible days");
        for (order, table) in orders.iter().zip(updates.iter_mut()) {
            zero_fill(order, window, table, group);
        }
    }

    for (order, table) in orders.iter_mut().zip(updates) {
        let autopilot = order.autopilot_mut();
        autopilot.utilization.overlay(&table);
        autopilot.updates = table;
    }

    Ok(())
}

fn distribute(
    orders: &[Order],
    units: &[NormalizedUnits],
    report: &UsageReport,
    window: &AllocationWindow,
    group: &AllocationGroupKey,
    updates: &mut [UtilizationTable],
) -> Result<()> {
    for sample in report.hourly_samples() {
        if sample.excluded {
            warn!(group = %group, label = %sample.label, "Excluded usage sample skipped");
            continue;
        }

        let instant = sample.hour().map_err(|source| {
            error!(group = %group, label = %sample.label, error = %source, "Invalid hour label");
            AttributionError::InvalidHourLabel {
                group: group.to_string(),
                label: sample.label.clone(),
                source,
            }
        })?;

        if instant >= window.cutoff {
            continue;
        }

        let day = instant.format(DAY_FORMAT).to_string();
        let hour = instant.format(HOUR_FORMAT).to_string();
        let mut remaining = sample.quantity;

        for ((order, units), table) in orders.iter().zip(units).zip(updates.iter_mut()) {
            if !order.config.covers(instant) {
                continue;
            }

            let allocated = if remaining <= 0.0 {
                0.0
            } else if remaining >= units.units_per_hour {
                units.units_per_hour
            } else {
                // fractional rest is valid utilization
                remaining
            };
            remaining -= allocated;

            table.set(&day, &hour, allocated);
        }
    }

    Ok(())
}

/// Zero-fill every eligible day of one order.
///
/// Before the order ends the window runs from its start through the day before
/// the cutoff. Once the cutoff has passed the order's end it runs from
/// `max(start, now - lookback)` through the end day.
fn zero_fill(
    order: &Order,
    window: &AllocationWindow,
    table: &mut UtilizationTable,
    group: &AllocationGroupKey,
) {
    let start = order.config.start_date;
    let end = order.config.end_date;

    if window.cutoff < start {
        debug!(group = %group, order_id = %order.id, "Order starts after cutoff, nothing to zero-fill");
        return;
    }

    let (first, last) = if window.cutoff > end {
        let lookback_start = window.now - window.lookback;
        (start.max(lookback_start).date_naive(), end.date_naive())
    } else {
        (
            start.date_naive(),
            (window.cutoff - Duration::nanoseconds(1)).date_naive(),
        )
    };

    for day in days_between(first, last) {
        table.zero_fill_day(&day.format(DAY_FORMAT).to_string());
    }

    info!(group = %group, order_id = %order.id, first = %first, last = %last, "Zero-filled order utilization");
}

fn days_between(first: NaiveDate, last: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    first.iter_days().take_while(move |day| *day <= last)
}
