//! Outcome of one customer run.

use serde::{Deserialize, Serialize};

use ri_billing_core::CustomerId;

/// Counters describing what a customer run did.
///
/// Partial success is normal: skipped orders and failed groups are counted here
/// rather than failing the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Customer processed.
    pub customer: CustomerId,
    /// Active orders loaded at the start of the run.
    pub orders_loaded: usize,
    /// Orders allocated and qualified.
    pub orders_processed: usize,
    /// Orders skipped because of missing data.
    pub orders_skipped: usize,
    /// Orders retired during the run.
    pub orders_retired: usize,
    /// Allocation groups processed.
    pub groups_processed: usize,
    /// Allocation groups that failed and kept their previous results.
    pub groups_failed: usize,
    /// Invoice adjustments created.
    pub adjustments_created: usize,
    /// Invoice adjustments whose amount was updated.
    pub adjustments_updated: usize,
    /// Invoice adjustments finalized.
    pub adjustments_finalized: usize,
    /// Billing line items accepted by the sink.
    pub line_items_scheduled: usize,
    /// Sub-items that failed: groups, writes, line items and retirements.
    pub failed_items: usize,
}

impl RunSummary {
    /// Create an empty summary for `customer`.
    #[must_use]
    pub fn new(customer: CustomerId) -> Self {
        Self {
            customer,
            orders_loaded: 0,
            orders_processed: 0,
            orders_skipped: 0,
            orders_retired: 0,
            groups_processed: 0,
            groups_failed: 0,
            adjustments_created: 0,
            adjustments_updated: 0,
            adjustments_finalized: 0,
            line_items_scheduled: 0,
            failed_items: 0,
        }
    }

    /// Whether nothing failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed_items == 0
    }
}
