//! Storage layer for ri-billing.
//!
//! This crate persists reserved-capacity orders, invoice adjustments and the
//! per-customer account scope. Two backends implement the [`Store`] trait:
//!
//! - [`MemoryStore`]: process-local maps, used by tests and local runs
//! - `RocksStore`: `RocksDB` with column families (feature `rocksdb-backend`)
//!
//! # Writes
//!
//! All mutations go through [`Store::commit`], which applies a list of
//! [`WriteOp`]s atomically: either every operation is written or none is.
//! Order updates carry the `updated_at` the caller read and fail with
//! [`StoreError::Conflict`] if the order changed in between.
//!
//! [`AutomaticWriteBatch`] splits a long list of operations into bounded
//! commits and collects the failures of each.
//!
//! # Example
//!
//! ```
//! use ri_billing_core::CustomerId;
//! use ri_billing_store::{MemoryStore, Store};
//!
//! let store = MemoryStore::new();
//! let customer: CustomerId = "cust-1".parse().unwrap();
//!
//! store
//!     .put_customer_accounts(&customer, &["111122223333".to_string()])
//!     .unwrap();
//! assert_eq!(store.customer_accounts(&customer).unwrap().len(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod batch;
pub mod error;
#[cfg(feature = "rocksdb-backend")]
pub mod keys;
pub mod memory;
pub mod ops;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
#[cfg(feature = "rocksdb-backend")]
pub mod schema;

pub use batch::{AutomaticWriteBatch, CommitFailure, DEFAULT_BATCH_LIMIT};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use ops::WriteOp;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use ri_billing_core::{
    AdjustmentFilter, AdjustmentId, CustomerId, InvoiceAdjustment, Order, OrderId, OrderStatus,
};

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (e.g., `RocksDB`, in-memory for testing).
pub trait Store: Send + Sync {
    // =========================================================================
    // Order Operations
    // =========================================================================

    /// Insert or replace an order record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_order(&self, order: &Order) -> Result<()>;

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// List a customer's orders ordered by ID, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_orders(&self, customer: &CustomerId, status: Option<OrderStatus>)
        -> Result<Vec<Order>>;

    // =========================================================================
    // Account Scope Operations
    // =========================================================================

    /// Replace the set of cloud accounts eligible for a customer.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_customer_accounts(&self, customer: &CustomerId, accounts: &[String]) -> Result<()>;

    /// Get the cloud accounts eligible for a customer (empty if none recorded).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn customer_accounts(&self, customer: &CustomerId) -> Result<Vec<String>>;

    // =========================================================================
    // Invoice Adjustment Operations
    // =========================================================================

    /// Get an invoice adjustment by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_adjustment(&self, id: &AdjustmentId) -> Result<Option<InvoiceAdjustment>>;

    /// Find every adjustment matching `filter`, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_adjustments(&self, filter: &AdjustmentFilter) -> Result<Vec<InvoiceAdjustment>>;

    /// List a customer's adjustments, ordered by ID (oldest first).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_adjustments(&self, customer: &CustomerId) -> Result<Vec<InvoiceAdjustment>>;

    // =========================================================================
    // Batched Writes
    // =========================================================================

    /// Apply `ops` atomically.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if an updated record doesn't exist.
    /// - `StoreError::Conflict` if an order's `updated_at` token is stale or a
    ///   created adjustment already exists.
    ///
    /// No operation is written when an error is returned.
    fn commit(&self, ops: &[WriteOp]) -> Result<()>;
}
