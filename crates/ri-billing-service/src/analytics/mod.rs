//! Analytics API integration for hourly usage reports.
//!
//! The analytics service aggregates metered instance usage per hour. Each
//! allocation group is fetched as one single-dimension report over time,
//! filtered to the group's region, operating system, family or type and the
//! customer's eligible accounts.

pub mod client;
pub mod types;

pub use client::{AnalyticsClient, AnalyticsError};
pub use types::*;
