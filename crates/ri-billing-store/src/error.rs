//! Error types for ri-billing storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// Identifier looked up.
        id: String,
    },

    /// The record changed since it was read, or already exists.
    #[error("{entity} conflict: {id}")]
    Conflict {
        /// Kind of record.
        entity: &'static str,
        /// Identifier of the conflicting record.
        id: String,
    },
}

impl StoreError {
    pub(crate) fn order_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "order",
            id: id.to_string(),
        }
    }

    pub(crate) fn adjustment_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "invoice adjustment",
            id: id.to_string(),
        }
    }
}
