//! Core types and attribution algorithms for ri-billing.
//!
//! This crate provides the foundational types and the pure algorithms used to
//! reconcile metered compute usage against reserved-capacity commitments:
//!
//! - **Identifiers**: `CustomerId`, `EntityId`, `OrderId`, `AdjustmentId`
//! - **Orders**: `Order`, `OrderStatus`, `OrderConfig`, `NormalizedUnits`, `OrderPricing`
//! - **Utilization**: `UtilizationTable`, `Autopilot`
//! - **Usage**: `UsageReport`, `UsageSample`
//! - **Allocation**: `allocate` distributes hourly usage across an allocation group
//! - **Qualification**: `qualify` judges each discrete capacity line
//! - **Rollup**: `Rollup`, `ActiveOrderCounts`, `InvoiceAdjustment`
//!
//! # Normalized units
//!
//! Commitments of different instance sizes are compared on one scale: a `large`
//! instance is 4 units, an `xlarge` 8 units, a `nano` 0.25 units. All usage and
//! capacity figures in this crate are expressed in normalized units per hour.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod adjustment;
pub mod allocation;
pub mod error;
pub mod group;
pub mod ids;
pub mod normalization;
pub mod order;
pub mod qualification;
pub mod rollup;
pub mod time;
pub mod usage;
pub mod utilization;

#[cfg(test)]
mod fixtures;

pub use adjustment::{select_adjustment, AdjustmentFilter, InvoiceAdjustment};
pub use allocation::{allocate, sort_for_allocation, AllocationWindow};
pub use error::{AttributionError, Result};
pub use group::{AllocationGroupKey, RollupKey};
pub use ids::{AdjustmentId, CustomerId, EntityId, IdError, OrderId};
pub use normalization::normalization_factor;
pub use order::{NormalizedUnits, Order, OrderConfig, OrderPricing, OrderStatus};
pub use qualification::{increment_and_iterations, qualify};
pub use rollup::{ActiveOrderCounts, Rollup};
pub use time::{month_to_date_cutoff, DAY_FORMAT, HOUR_FORMAT, HOUR_LABEL_FORMAT};
pub use usage::{UsageReport, UsageSample};
pub use utilization::{Autopilot, UtilizationTable};
