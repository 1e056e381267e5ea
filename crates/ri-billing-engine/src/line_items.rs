//! Billing line items derived from the monthly rollup.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use ri_billing_core::time::first_of_month;
use ri_billing_core::CustomerId;

use crate::error::LineItemError;

/// Net savings of one commitment-end month, to be billed as a line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingLineItem {
    /// Customer billed.
    pub customer: CustomerId,
    /// Commitment-end month the amount belongs to.
    pub month: NaiveDate,
    /// Net `penalty - savings`.
    pub amount: f64,
    /// Instant the amount is reported at.
    pub time_instance: DateTime<Utc>,
}

/// Receives the line items of a run.
#[async_trait]
pub trait BillingLineItemSink: Send + Sync {
    /// Schedule one line item.
    async fn schedule(&self, item: &BillingLineItem) -> Result<(), LineItemError>;
}

/// Instant a month's line item is reported at, if any.
///
/// The current month is reported one day before the month-to-date cutoff, and
/// skipped while that day is still in the previous month. Past months are
/// reported on the last day of the previous month.
#[must_use]
pub fn line_item_instant(
    month: NaiveDate,
    now: DateTime<Utc>,
    cutoff: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let current_month = first_of_month(now);
    let month_start = current_month.and_hms_opt(0, 0, 0)?.and_utc();

    if month == current_month {
        let instant = cutoff - Duration::hours(24);
        (instant >= month_start).then_some(instant)
    } else {
        Some(month_start - Duration::days(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn month(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn current_month_uses_day_before_cutoff() {
        let now = Utc.with_ymd_and_hms(2025, 3, 20, 9, 30, 0).unwrap();
        let cutoff = Utc.with_ymd_and_hms(2025, 3, 17, 0, 0, 0).unwrap();
        assert_eq!(
            line_item_instant(month(2025, 3), now, cutoff),
            Some(Utc.with_ymd_and_hms(2025, 3, 16, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn current_month_skipped_early_in_month() {
        let now = Utc.with_ymd_and_hms(2025, 3, 2, 9, 30, 0).unwrap();
        let cutoff = Utc.with_ymd_and_hms(2025, 2, 27, 0, 0, 0).unwrap();
        assert_eq!(line_item_instant(month(2025, 3), now, cutoff), None);
    }

    #[test]
    fn first_day_of_month_is_kept() {
        let now = Utc.with_ymd_and_hms(2025, 3, 5, 0, 0, 0).unwrap();
        let cutoff = Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap();
        assert_eq!(
            line_item_instant(month(2025, 3), now, cutoff),
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn past_month_uses_last_day_of_previous_month() {
        let now = Utc.with_ymd_and_hms(2025, 3, 20, 9, 30, 0).unwrap();
        let cutoff = Utc.with_ymd_and_hms(2025, 3, 17, 0, 0, 0).unwrap();
        let expected = Some(Utc.with_ymd_and_hms(2025, 2, 28, 0, 0, 0).unwrap());
        assert_eq!(line_item_instant(month(2025, 2), now, cutoff), expected);
        assert_eq!(line_item_instant(month(2024, 11), now, cutoff), expected);
    }
}
