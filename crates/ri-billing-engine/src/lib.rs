//! Per-customer attribution runs for ri-billing.
//!
//! [`AttributionEngine::run_customer`] is invoked once per customer by an
//! external fan-out. For that customer it:
//!
//! 1. loads the active orders and retires the expired ones
//! 2. groups orders into allocation groups and fetches each group's usage
//!    report from a [`UsageReportSource`]
//! 3. allocates and qualifies each group, writing the results back
//! 4. rolls the results up into invoice adjustments and finalizes the
//!    adjustments of keys without active orders
//!
//! Groups are processed one after another; a failing group is logged and
//! counted, the rest of the run continues.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod engine;
pub mod error;
pub mod line_items;
pub mod report;
pub mod summary;

pub use config::EngineConfig;
pub use engine::AttributionEngine;
pub use error::{EngineError, LineItemError, ReportError, Result};
pub use line_items::{line_item_instant, BillingLineItem, BillingLineItemSink};
pub use report::{StaticReports, UsageQuery, UsageReportSource};
pub use summary::RunSummary;
