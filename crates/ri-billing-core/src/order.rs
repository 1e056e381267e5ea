//! Reserved-capacity order types.
//!
//! An order is one commitment to a number of instances of a given size, for a
//! fixed window, in one region and operating system.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AttributionError, Result};
use crate::ids::{CustomerId, EntityId, OrderId};
use crate::normalization::normalization_factor;
use crate::utilization::Autopilot;

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Drafted, not yet submitted.
    New,
    /// Submitted, awaiting acceptance.
    Pending,
    /// Accepted and consuming usage.
    Active,
    /// Commitment window has closed.
    Retired,
    /// Could not be fulfilled.
    Failed,
    /// Withdrawn before activation.
    Canceled,
}

impl OrderStatus {
    /// Get the status name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Retired => "retired",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }
}

/// Commitment configuration of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderConfig {
    /// Cloud region (e.g. `us-east-2`).
    pub region: String,

    /// Instance type (e.g. `t3.large`).
    pub instance_type: String,

    /// Instance family (e.g. `t3`).
    pub instance_family: String,

    /// Operating system label.
    pub operating_system: String,

    /// Whether the commitment applies to any size in the family.
    /// Absent means size-flexible.
    #[serde(default)]
    pub size_flexible: Option<bool>,

    /// Number of committed instances.
    pub num_instances: u32,

    /// Cloud account the commitment was purchased for.
    #[serde(default)]
    pub account_id: Option<String>,

    /// Payer account that bills the commitment.
    #[serde(default)]
    pub payer_account_id: Option<String>,

    /// Start of the commitment window (inclusive).
    pub start_date: DateTime<Utc>,

    /// End of the commitment window.
    pub end_date: DateTime<Utc>,
}

impl OrderConfig {
    /// Whether the commitment applies to any size in its family.
    #[must_use]
    pub fn is_size_flexible(&self) -> bool {
        self.size_flexible.unwrap_or(true)
    }

    /// Whether `instant` falls inside `[start_date, end_date]`.
    #[must_use]
    pub fn covers(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start_date && instant <= self.end_date
    }
}

/// Normalized-unit descriptor of an order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedUnits {
    /// Committed normalized units per hour (`factor × num_instances`).
    pub units_per_hour: f64,

    /// Normalization factor of one instance of the committed size.
    pub factor: f64,
}

impl NormalizedUnits {
    /// Build the descriptor for `num_instances` instances of size `factor`.
    #[must_use]
    pub fn new(factor: f64, num_instances: u32) -> Self {
        Self {
            units_per_hour: factor * f64::from(num_instances),
            factor,
        }
    }
}

/// Per-normalized-unit rates of an order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderPricing {
    /// Savings earned per utilized normalized unit-hour.
    pub savings_per_hour_normalized: f64,

    /// Committed rate charged per unused normalized unit-hour.
    pub flexible_normalized: f64,

    /// On-demand reference rate, informational only.
    #[serde(default)]
    pub on_demand_normalized: Option<f64>,
}

/// A reserved-capacity order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Stable order identifier.
    pub id: OrderId,

    /// Owning customer.
    pub customer: CustomerId,

    /// Billing entity invoiced for this order.
    #[serde(default)]
    pub entity: Option<EntityId>,

    /// Lifecycle status.
    pub status: OrderStatus,

    /// Analytics-service tenant the usage report is requested for.
    pub client_id: i64,

    /// Commitment configuration.
    pub config: OrderConfig,

    /// Normalized-unit descriptor, set on activation.
    #[serde(default)]
    pub normalized_units: Option<NormalizedUnits>,

    /// Pricing, set on activation.
    #[serde(default)]
    pub pricing: Option<OrderPricing>,

    /// Attribution state; absent until the first allocation pass.
    #[serde(default)]
    pub autopilot: Option<Autopilot>,

    /// Last modification time, used as the optimistic-concurrency token.
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Whether the order is currently active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == OrderStatus::Active
    }

    /// Whether an active order has aged past its commitment window.
    ///
    /// The order stays active for `usage_delay + grace` after `end_date` so the
    /// lagging usage of its last days is still attributed.
    #[must_use]
    pub fn retirement_due(&self, now: DateTime<Utc>, usage_delay: Duration, grace: Duration) -> bool {
        self.is_active() && now > self.config.end_date + usage_delay + grace
    }

    /// Normalized units, or a data error if the order was never activated properly.
    ///
    /// # Errors
    ///
    /// Returns `AttributionError::MissingField` when absent.
    pub fn require_normalized_units(&self) -> Result<NormalizedUnits> {
        self.normalized_units.ok_or(AttributionError::MissingField {
            order_id: self.id,
            field: "normalized_units",
        })
    }

    /// Pricing, or a data error if the order was never priced.
    ///
    /// # Errors
    ///
    /// Returns `AttributionError::MissingField` when absent.
    pub fn require_pricing(&self) -> Result<OrderPricing> {
        self.pricing.ok_or(AttributionError::MissingField {
            order_id: self.id,
            field: "pricing",
        })
    }

    /// Billing entity, or a data error if the order has none.
    ///
    /// # Errors
    ///
    /// Returns `AttributionError::MissingField` when absent.
    pub fn require_entity(&self) -> Result<&EntityId> {
        self.entity.as_ref().ok_or(AttributionError::MissingField {
            order_id: self.id,
            field: "entity",
        })
    }

    /// Derive the normalized units from the instance size when none were recorded.
    ///
    /// # Errors
    ///
    /// Returns `AttributionError::UnknownInstanceType` if the size has no known factor.
    pub fn fill_normalized_units(&mut self) -> Result<()> {
        if self.normalized_units.is_none() {
            let (_, factor) = normalization_factor(&self.config.instance_type)?;
            self.normalized_units = Some(NormalizedUnits::new(factor, self.config.num_instances));
        }
        Ok(())
    }

    /// Check every field attribution relies on.
    ///
    /// # Errors
    ///
    /// Returns the first `AttributionError::MissingField` found.
    pub fn validate_for_attribution(&self) -> Result<()> {
        self.require_entity()?;
        let units = self.require_normalized_units()?;
        self.require_pricing()?;
        if units.factor <= 0.0 || units.units_per_hour <= 0.0 {
            return Err(AttributionError::MissingField {
                order_id: self.id,
                field: "normalized_units.factor",
            });
        }
        Ok(())
    }

    /// Attribution state, created empty on first use.
    pub fn autopilot_mut(&mut self) -> &mut Autopilot {
        self.autopilot.get_or_insert_with(Autopilot::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn order(status: OrderStatus) -> Order {
        Order {
            id: OrderId::new(1),
            customer: "cust".parse().unwrap(),
            entity: None,
            status,
            client_id: 7,
            config: OrderConfig {
                region: "us-east-2".into(),
                instance_type: "t3.large".into(),
                instance_family: "t3".into(),
                operating_system: "Linux/UNIX".into(),
                size_flexible: None,
                num_instances: 2,
                account_id: None,
                payer_account_id: None,
                start_date: Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap(),
                end_date: Utc.with_ymd_and_hms(2025, 2, 28, 23, 59, 59).unwrap(),
            },
            normalized_units: Some(NormalizedUnits::new(4.0, 2)),
            pricing: None,
            autopilot: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn normalized_units_multiply_instances() {
        let units = NormalizedUnits::new(0.25, 3);
        assert!((units.units_per_hour - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn size_flexible_defaults_to_true() {
        let order = order(OrderStatus::Active);
        assert!(order.config.is_size_flexible());
    }

    #[test]
    fn covers_is_inclusive_of_both_ends() {
        let order = order(OrderStatus::Active);
        assert!(order.config.covers(order.config.start_date));
        assert!(order.config.covers(order.config.end_date));
        assert!(!order
            .config
            .covers(order.config.end_date + Duration::seconds(1)));
    }

    #[test]
    fn retirement_waits_for_delay_and_grace() {
        let active = order(OrderStatus::Active);
        let delay = Duration::hours(72);
        let grace = Duration::days(3);

        let inside = Utc.with_ymd_and_hms(2025, 3, 6, 0, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2025, 3, 7, 0, 0, 0).unwrap();
        assert!(!active.retirement_due(inside, delay, grace));
        assert!(active.retirement_due(after, delay, grace));

        let retired = order(OrderStatus::Retired);
        assert!(!retired.retirement_due(after, delay, grace));
    }

    #[test]
    fn missing_units_come_from_the_size_table() {
        let mut order = order(OrderStatus::Active);
        order.normalized_units = None;
        order.fill_normalized_units().unwrap();
        assert_eq!(order.normalized_units, Some(NormalizedUnits::new(4.0, 2)));

        order.normalized_units = None;
        order.config.instance_type = "t3.giant".into();
        assert!(matches!(
            order.fill_normalized_units(),
            Err(AttributionError::UnknownInstanceType(_))
        ));
    }

    #[test]
    fn validation_reports_missing_entity_first() {
        let err = order(OrderStatus::Active)
            .validate_for_attribution()
            .unwrap_err();
        assert!(matches!(
            err,
            AttributionError::MissingField { field: "entity", .. }
        ));
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&OrderStatus::Canceled).unwrap();
        assert_eq!(json, "\"canceled\"");
        assert_eq!(OrderStatus::Active.as_str(), "active");
    }
}
