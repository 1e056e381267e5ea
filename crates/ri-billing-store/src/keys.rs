//! Key encoding utilities for `RocksDB`.
//!
//! Customer IDs never contain `#`, so `customer_id || '#'` is an unambiguous
//! prefix for the per-customer indexes.

use ri_billing_core::{AdjustmentId, CustomerId, OrderId};

const SEPARATOR: u8 = b'#';

/// Create an order key from an order ID.
#[must_use]
pub fn order_key(id: OrderId) -> [u8; 8] {
    id.value().to_be_bytes()
}

/// Create a prefix for iterating all index entries of a customer.
#[must_use]
pub fn customer_prefix(customer: &CustomerId) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(customer.as_bytes().len() + 1);
    prefix.extend_from_slice(customer.as_bytes());
    prefix.push(SEPARATOR);
    prefix
}

/// Create a customer-order index key.
///
/// Format: `customer_id || '#' || order_id (8 bytes)`
#[must_use]
pub fn customer_order_key(customer: &CustomerId, id: OrderId) -> Vec<u8> {
    let mut key = customer_prefix(customer);
    key.extend_from_slice(&order_key(id));
    key
}

/// Create an adjustment key from an adjustment ID.
#[must_use]
pub fn adjustment_key(id: &AdjustmentId) -> [u8; 16] {
    id.to_bytes()
}

/// Create a customer-adjustment index key.
///
/// Format: `customer_id || '#' || adjustment_id (16 bytes)`
///
/// Since ULIDs are time-ordered, a customer's adjustments are sorted by creation time.
#[must_use]
pub fn customer_adjustment_key(customer: &CustomerId, id: &AdjustmentId) -> Vec<u8> {
    let mut key = customer_prefix(customer);
    key.extend_from_slice(&adjustment_key(id));
    key
}

/// Extract the order ID from a customer-order index key.
#[must_use]
pub fn order_id_from_index(key: &[u8]) -> Option<OrderId> {
    let tail: [u8; 8] = key.get(key.len().checked_sub(8)?..)?.try_into().ok()?;
    Some(OrderId::new(i64::from_be_bytes(tail)))
}

/// Extract the adjustment ID from a customer-adjustment index key.
#[must_use]
pub fn adjustment_id_from_index(key: &[u8]) -> Option<AdjustmentId> {
    let tail: [u8; 16] = key.get(key.len().checked_sub(16)?..)?.try_into().ok()?;
    Some(AdjustmentId::from_bytes(tail))
}

/// Create a customer-accounts key.
#[must_use]
pub fn customer_accounts_key(customer: &CustomerId) -> Vec<u8> {
    customer.as_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_order_key_format() {
        let customer: CustomerId = "cust".parse().unwrap();
        let key = customer_order_key(&customer, OrderId::new(42));

        assert_eq!(key.len(), 4 + 1 + 8);
        assert!(key.starts_with(b"cust#"));
        assert_eq!(order_id_from_index(&key), Some(OrderId::new(42)));
    }

    #[test]
    fn customer_adjustment_key_roundtrip() {
        let customer: CustomerId = "cust".parse().unwrap();
        let id = AdjustmentId::generate();
        let key = customer_adjustment_key(&customer, &id);

        assert_eq!(&key[5..], id.to_bytes());
        assert_eq!(adjustment_id_from_index(&key), Some(id));
    }

    #[test]
    fn prefixes_do_not_overlap() {
        let short: CustomerId = "ab".parse().unwrap();
        let long: CustomerId = "abc".parse().unwrap();
        let key = customer_order_key(&long, OrderId::new(1));
        assert!(!key.starts_with(&customer_prefix(&short)));
    }

    #[test]
    fn short_keys_are_rejected() {
        assert_eq!(order_id_from_index(b"abc"), None);
        assert_eq!(adjustment_id_from_index(b"abc"), None);
    }
}
