//! Utilization tables and month-to-date aggregates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-day, per-hour utilized quantity in normalized units.
///
/// Keys are `"YYYY-MM-DD"` → `"HH"`. Ordered maps keep serialization and
/// iteration deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UtilizationTable(BTreeMap<String, BTreeMap<String, f64>>);

impl UtilizationTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value recorded for `(day, hour)`.
    #[must_use]
    pub fn get(&self, day: &str, hour: &str) -> Option<f64> {
        self.0.get(day).and_then(|hours| hours.get(hour)).copied()
    }

    /// Record `value` for `(day, hour)`, replacing any previous value.
    pub fn set(&mut self, day: &str, hour: &str, value: f64) {
        self.0
            .entry(day.to_string())
            .or_default()
            .insert(hour.to_string(), value);
    }

    /// Replace `day` with 24 explicit zero-valued hours.
    pub fn zero_fill_day(&mut self, day: &str) {
        let hours = (0..24).map(|hour| (format!("{hour:02}"), 0.0)).collect();
        self.0.insert(day.to_string(), hours);
    }

    /// Copy every `(day, hour)` entry of `other` into `self`, overwriting
    /// entries present in both.
    pub fn overlay(&mut self, other: &Self) {
        for (day, hours) in &other.0 {
            let target = self.0.entry(day.clone()).or_default();
            for (hour, value) in hours {
                target.insert(hour.clone(), *value);
            }
        }
    }

    /// Number of days present.
    #[must_use]
    pub fn day_count(&self) -> usize {
        self.0.len()
    }

    /// Number of hours recorded for `day`.
    #[must_use]
    pub fn hour_count(&self, day: &str) -> usize {
        self.0.get(day).map_or(0, BTreeMap::len)
    }

    /// Whether no day is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the day keys.
    pub fn days(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterate mutably over every `(day, hour, value)` entry in key order.
    pub fn entries_mut(&mut self) -> impl Iterator<Item = (&str, &str, &mut f64)> {
        self.0.iter_mut().flat_map(|(day, hours)| {
            hours
                .iter_mut()
                .map(move |(hour, value)| (day.as_str(), hour.as_str(), value))
        })
    }

    /// Sum of every recorded hourly value.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.0.values().flat_map(BTreeMap::values).sum()
    }
}

/// Attribution state carried by an order that takes part in automatic allocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Autopilot {
    /// Committed per-hour utilization (persisted).
    pub utilization: UtilizationTable,

    /// Number of discrete capacity lines that qualified this month.
    pub mtd_qualified_line_units: u64,

    /// Utilization consumed by qualified lines.
    pub mtd_qualified_utilization: f64,

    /// Utilization consumed by discarded lines.
    pub mtd_unqualified_utilization: f64,

    /// Savings earned by qualified lines.
    pub mtd_savings_at_rate: f64,

    /// Penalty owed by qualified lines.
    pub mtd_penalty_at_rate: f64,

    /// Working copy rebuilt on every allocation pass; never persisted.
    #[serde(skip)]
    pub updates: UtilizationTable,

    /// Savings of discarded lines, kept for diagnostics only.
    #[serde(skip)]
    pub mtd_discarded_savings_at_rate: f64,

    /// Penalty of discarded lines, kept for diagnostics only.
    #[serde(skip)]
    pub mtd_discarded_penalty_at_rate: f64,
}

impl Autopilot {
    /// Zero every month-to-date aggregate.
    pub fn reset_month_to_date(&mut self) {
        self.mtd_qualified_line_units = 0;
        self.mtd_qualified_utilization = 0.0;
        self.mtd_unqualified_utilization = 0.0;
        self.mtd_savings_at_rate = 0.0;
        self.mtd_penalty_at_rate = 0.0;
        self.mtd_discarded_savings_at_rate = 0.0;
        self.mtd_discarded_penalty_at_rate = 0.0;
    }

    /// Net amount this order contributes to its invoice adjustment.
    ///
    /// Negative means a net saving to the customer.
    #[must_use]
    pub fn net_adjustment(&self) -> f64 {
        self.mtd_penalty_at_rate - self.mtd_savings_at_rate
    }
}
