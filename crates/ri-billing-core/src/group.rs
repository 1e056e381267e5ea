//! Grouping keys.
//!
//! Orders compete for usage inside an [`AllocationGroupKey`] and are summed into
//! invoice adjustments per [`RollupKey`].

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ids::{CustomerId, EntityId};
use crate::order::Order;
use crate::time::first_of_month;

/// Identity of one shared hourly usage pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AllocationGroupKey {
    /// Cloud region.
    pub region: String,

    /// Instance family for size-flexible orders, otherwise the exact instance type.
    pub family_or_type: String,

    /// Operating system label.
    pub operating_system: String,

    /// Analytics-service tenant.
    pub client_id: i64,

    /// First day of the month the commitment starts in.
    pub commitment_month: NaiveDate,
}

impl AllocationGroupKey {
    /// Derive the group an order competes in.
    #[must_use]
    pub fn for_order(order: &Order) -> Self {
        let config = &order.config;
        let family_or_type = if config.is_size_flexible() {
            config.instance_family.clone()
        } else {
            config.instance_type.clone()
        };

        Self {
            region: config.region.clone(),
            family_or_type,
            operating_system: config.operating_system.clone(),
            client_id: order.client_id,
            commitment_month: first_of_month(config.start_date),
        }
    }
}

impl fmt::Display for AllocationGroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}",
            self.region,
            self.family_or_type,
            self.operating_system,
            self.client_id,
            self.commitment_month.format("%Y-%m")
        )
    }
}

/// Identity of one invoice adjustment: `(end month, customer, entity)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RollupKey {
    /// First day of the month the commitment ends in.
    pub month: NaiveDate,

    /// Owning customer.
    pub customer: CustomerId,

    /// Billing entity.
    pub entity: EntityId,
}

impl RollupKey {
    /// Derive the rollup key of an order.
    ///
    /// # Errors
    ///
    /// Returns `AttributionError::MissingField` if the order has no billing entity.
    pub fn for_order(order: &Order) -> Result<Self> {
        Ok(Self {
            month: first_of_month(order.config.end_date),
            customer: order.customer.clone(),
            entity: order.require_entity()?.clone(),
        })
    }
}

impl fmt::Display for RollupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.month.format("%Y-%m"),
            self.customer,
            self.entity
        )
    }
}
