//! Error types for ri-billing attribution.

use crate::ids::{IdError, OrderId};

/// Result type for attribution operations.
pub type Result<T> = std::result::Result<T, AttributionError>;

/// Errors that can occur while allocating or qualifying usage.
#[derive(Debug, thiserror::Error)]
pub enum AttributionError {
    /// A usage sample carried an hour label that could not be parsed.
    ///
    /// Aborts allocation for the whole group.
    #[error("invalid hour label {label:?} in group {group}: {source}")]
    InvalidHourLabel {
        /// The allocation group being processed.
        group: String,
        /// The offending label.
        label: String,
        /// Underlying parse error.
        #[source]
        source: chrono::ParseError,
    },

    /// An order lacks a field required for attribution.
    #[error("order {order_id} is missing {field}")]
    MissingField {
        /// The order that is incomplete.
        order_id: OrderId,
        /// Name of the missing field.
        field: &'static str,
    },

    /// Instance type has no known normalization factor.
    #[error("unknown instance type: {0}")]
    UnknownInstanceType(String),

    /// The usage report is structurally invalid.
    #[error("invalid usage report: {0}")]
    InvalidReport(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}
