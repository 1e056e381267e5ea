//! Invoice-adjustment records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::group::RollupKey;
use crate::ids::{AdjustmentId, CustomerId, EntityId};

/// A signed adjustment applied to a customer's invoice for one month and entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceAdjustment {
    /// Record identifier.
    pub id: AdjustmentId,

    /// Customer invoiced.
    pub customer: CustomerId,

    /// Billing entity invoiced.
    pub entity: EntityId,

    /// Tag identifying the program that owns this record.
    pub details: String,

    /// Human-readable line description.
    pub description: String,

    /// Invoice months the adjustment applies to (first day of each month).
    pub invoice_months: Vec<NaiveDate>,

    /// ISO currency code.
    pub currency: String,

    /// Signed amount; negative is a net saving to the customer.
    pub amount: f64,

    /// Closed for this cycle; no further updates are expected.
    pub finalized: bool,

    /// Creation time.
    pub created_at: DateTime<Utc>,

    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl InvoiceAdjustment {
    /// Create an open adjustment for `key`.
    #[must_use]
    pub fn new(
        key: &RollupKey,
        details: impl Into<String>,
        description: impl Into<String>,
        currency: impl Into<String>,
        amount: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AdjustmentId::generate(),
            customer: key.customer.clone(),
            entity: key.entity.clone(),
            details: details.into(),
            description: description.into(),
            invoice_months: vec![key.month],
            currency: currency.into(),
            amount,
            finalized: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Lookup filter for adjustments owned by one rollup key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustmentFilter {
    /// Required `details` tag.
    pub details: String,

    /// Month that must appear in `invoice_months`.
    pub month: NaiveDate,

    /// Customer owning the record.
    pub customer: CustomerId,

    /// Entity owning the record.
    pub entity: EntityId,
}

impl AdjustmentFilter {
    /// Filter for the record of `key` carrying the `details` tag.
    #[must_use]
    pub fn for_key(details: impl Into<String>, key: &RollupKey) -> Self {
        Self {
            details: details.into(),
            month: key.month,
            customer: key.customer.clone(),
            entity: key.entity.clone(),
        }
    }

    /// Whether `adjustment` matches this filter.
    #[must_use]
    pub fn matches(&self, adjustment: &InvoiceAdjustment) -> bool {
        adjustment.details == self.details
            && adjustment.customer == self.customer
            && adjustment.entity == self.entity
            && adjustment.invoice_months.contains(&self.month)
    }
}

/// Pick the record to act on among several matches: earliest `created_at`,
/// then smallest id.
#[must_use]
pub fn select_adjustment(matches: &[InvoiceAdjustment]) -> Option<&InvoiceAdjustment> {
    matches
        .iter()
        .min_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn key() -> RollupKey {
        RollupKey {
            month: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            customer: "cust-1".parse().unwrap(),
            entity: "ent-1".parse().unwrap(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 7, 8, 0, 0).unwrap()
    }

    #[test]
    fn filter_matches_on_all_fields() {
        let adjustment = InvoiceAdjustment::new(&key(), "RI Savings", "Savings", "USD", -1.0, now());
        let filter = AdjustmentFilter::for_key("RI Savings", &key());
        assert!(filter.matches(&adjustment));

        let other_tag = AdjustmentFilter::for_key("Manual", &key());
        assert!(!other_tag.matches(&adjustment));

        let mut other_month = filter.clone();
        other_month.month = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        assert!(!other_month.matches(&adjustment));

        let mut other_entity = filter;
        other_entity.entity = "ent-2".parse().unwrap();
        assert!(!other_entity.matches(&adjustment));
    }

    #[test]
    fn selection_prefers_oldest_then_smallest_id() {
        let a = InvoiceAdjustment::new(&key(), "t", "d", "USD", 1.0, now());
        let b = InvoiceAdjustment::new(&key(), "t", "d", "USD", 2.0, now() - Duration::days(1));
        let c = InvoiceAdjustment::new(&key(), "t", "d", "USD", 3.0, now() - Duration::days(1));

        let records = vec![a, b.clone(), c.clone()];
        let selected = select_adjustment(&records).unwrap();
        let expected = if b.id < c.id { &b } else { &c };
        assert_eq!(selected.id, expected.id);

        assert!(select_adjustment(&[]).is_none());
    }
}
