//! Error types for attribution runs.

use ri_billing_core::AttributionError;
use ri_billing_store::{CommitFailure, StoreError};

use crate::summary::RunSummary;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can end an attribution run or one of its groups.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Storage read failed.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Allocation or qualification failed.
    #[error("attribution error: {0}")]
    Attribution(#[from] AttributionError),

    /// The usage report could not be obtained.
    #[error("usage report error: {0}")]
    Report(#[from] ReportError),

    /// One or more batch commits failed.
    ///
    /// The run itself completed; `summary` describes everything else it did.
    #[error("{} batch commit(s) failed", .failures.len())]
    Commit {
        /// Every failed physical commit of the run.
        failures: Vec<CommitFailure>,
        /// Outcome of the run.
        summary: Box<RunSummary>,
    },

    /// Invalid engine configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors returned by a usage report source.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// The analytics service could not be reached or refused the query.
    #[error("usage report unavailable: {0}")]
    Unavailable(String),

    /// The report was returned but could not be decoded.
    #[error(transparent)]
    Invalid(#[from] AttributionError),
}

/// Error returned by a billing line-item sink.
#[derive(Debug, thiserror::Error)]
#[error("billing line item rejected: {0}")]
pub struct LineItemError(pub String);
