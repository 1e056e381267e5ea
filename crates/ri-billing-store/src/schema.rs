//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Order records, keyed by order ID (big-endian).
    pub const ORDERS: &str = "orders";

    /// Index: orders by customer, keyed by `customer_id || '#' || order_id`.
    /// Value is empty (index only).
    pub const ORDERS_BY_CUSTOMER: &str = "orders_by_customer";

    /// Invoice adjustments, keyed by adjustment ID (ULID).
    pub const ADJUSTMENTS: &str = "adjustments";

    /// Index: adjustments by customer, keyed by `customer_id || '#' || adjustment_id`.
    /// Value is empty (index only).
    pub const ADJUSTMENTS_BY_CUSTOMER: &str = "adjustments_by_customer";

    /// Eligible cloud accounts, keyed by customer ID.
    pub const CUSTOMER_ACCOUNTS: &str = "customer_accounts";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::ORDERS,
        cf::ORDERS_BY_CUSTOMER,
        cf::ADJUSTMENTS,
        cf::ADJUSTMENTS_BY_CUSTOMER,
        cf::CUSTOMER_ACCOUNTS,
    ]
}
