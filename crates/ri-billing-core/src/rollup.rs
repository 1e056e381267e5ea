//! Rollup of per-order results into invoice-adjustment amounts.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::error;

use crate::error::Result;
use crate::group::RollupKey;
use crate::order::Order;

/// Net `penalty - savings` per rollup key and per month.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rollup {
    adjustments: BTreeMap<RollupKey, f64>,
    by_month: BTreeMap<NaiveDate, f64>,
}

impl Rollup {
    /// Create an empty rollup.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an order's month-to-date result under its rollup key.
    ///
    /// An order that never went through attribution still opens its key with a
    /// zero contribution.
    ///
    /// # Errors
    ///
    /// Returns `AttributionError::MissingField` if the order has no billing entity.
    pub fn add_order(&mut self, order: &Order) -> Result<RollupKey> {
        let key = RollupKey::for_order(order)?;
        let amount = self.adjustments.entry(key.clone()).or_insert(0.0);

        if let Some(autopilot) = &order.autopilot {
            let net = autopilot.net_adjustment();
            *amount += net;
            *self.by_month.entry(key.month).or_insert(0.0) += net;
        } else {
            error!(order_id = %order.id, rollup_key = %key, "Order has no attribution state, not included in savings");
        }

        Ok(key)
    }

    /// Net amount per rollup key, in key order.
    pub fn adjustments(&self) -> impl Iterator<Item = (&RollupKey, f64)> {
        self.adjustments.iter().map(|(key, amount)| (key, *amount))
    }

    /// Net amount per commitment-end month.
    #[must_use]
    pub fn by_month(&self) -> &BTreeMap<NaiveDate, f64> {
        &self.by_month
    }

    /// Number of rollup keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.adjustments.len()
    }

    /// Whether no key has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adjustments.is_empty()
    }
}

/// Number of still-active orders per rollup key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveOrderCounts(BTreeMap<RollupKey, u64>);

impl ActiveOrderCounts {
    /// Create an empty count table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one order under `key`. Inactive orders register the key with no count.
    pub fn record(&mut self, key: RollupKey, active: bool) {
        let count = self.0.entry(key).or_insert(0);
        if active {
            *count += 1;
        }
    }

    /// Active orders recorded for `key`.
    #[must_use]
    pub fn get(&self, key: &RollupKey) -> Option<u64> {
        self.0.get(key).copied()
    }

    /// Keys without any active order left.
    pub fn finalizable(&self) -> impl Iterator<Item = &RollupKey> {
        self.0
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(key, _)| key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, end_of_day, order, order_in_window, TOLERANCE};
    use crate::utilization::Autopilot;

    fn with_result(mut order: Order, savings: f64, penalty: f64) -> Order {
        order.autopilot = Some(Autopilot {
            mtd_savings_at_rate: savings,
            mtd_penalty_at_rate: penalty,
            ..Autopilot::default()
        });
        order
    }

    #[test]
    fn sums_net_per_key_and_month() {
        let mut other_entity = with_result(order(3, "t3.small", 1.0, 1), 1.0, 0.0);
        other_entity.entity = Some("ent-2".parse().unwrap());
        let february = with_result(
            order_in_window(4, "t3.small", 1.0, 1, at(2025, 2, 1, 0), end_of_day(2025, 2, 28)),
            0.0,
            0.5,
        );

        let orders = [
            with_result(order(1, "t3.small", 1.0, 1), 0.065, 0.03),
            with_result(order(2, "t3.large", 4.0, 1), 0.26, 0.12),
            other_entity,
            february,
        ];

        let mut rollup = Rollup::new();
        for order in &orders {
            rollup.add_order(order).unwrap();
        }

        assert_eq!(rollup.len(), 3);
        let amounts: Vec<f64> = rollup.adjustments().map(|(_, amount)| amount).collect();
        assert!((amounts[0] - (0.15 - 0.325)).abs() < TOLERANCE);
        assert!((amounts[1] + 1.0).abs() < TOLERANCE);
        assert!((amounts[2] - 0.5).abs() < TOLERANCE);

        let january = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert!((rollup.by_month()[&january] - (0.15 - 1.325)).abs() < TOLERANCE);
    }

    #[test]
    fn order_without_state_opens_key_at_zero() {
        let mut rollup = Rollup::new();
        let key = rollup.add_order(&order(1, "t3.small", 1.0, 1)).unwrap();

        assert_eq!(rollup.adjustments().next(), Some((&key, 0.0)));
        assert!(rollup.by_month().is_empty());
    }

    #[test]
    fn order_without_entity_is_rejected() {
        let mut order = order(1, "t3.small", 1.0, 1);
        order.entity = None;
        assert!(Rollup::new().add_order(&order).is_err());
    }

    #[test]
    fn finalizable_keys_have_no_active_orders() {
        let open = RollupKey::for_order(&order(1, "t3.small", 1.0, 1)).unwrap();
        let mut closed = open.clone();
        closed.entity = "ent-2".parse().unwrap();

        let mut counts = ActiveOrderCounts::new();
        counts.record(open.clone(), false);
        counts.record(open.clone(), true);
        counts.record(closed.clone(), false);
        counts.record(closed.clone(), false);

        assert_eq!(counts.get(&open), Some(1));
        assert_eq!(counts.get(&closed), Some(0));
        assert_eq!(counts.finalizable().collect::<Vec<_>>(), vec![&closed]);
    }
}
