//! Identifier types for ri-billing.
//!
//! This module provides strongly-typed identifiers for customers, billing entities,
//! orders, and invoice adjustments.
//!
//! # Macro-based ID Types
//!
//! The `document_id_type!` macro reduces boilerplate for document-store identifiers,
//! ensuring consistent implementation of serialization, parsing, and display traits.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Macro to define a string-backed document identifier with standard trait implementations.
///
/// This macro generates a newtype wrapper around `String` with implementations for:
/// - `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `Serialize`, `Deserialize` (as string, rejecting empty values)
/// - `FromStr`, `Display`, `Debug`
/// - `TryFrom<String>`, `Into<String>`
///
/// # Example
///
/// ```ignore
/// document_id_type!(MyId, "A custom identifier type.");
/// let id: MyId = "abc".parse().unwrap();
/// ```
macro_rules! document_id_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Return the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Return the bytes of the identifier.
            #[must_use]
            pub fn as_bytes(&self) -> &[u8] {
                self.0.as_bytes()
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(IdError::Empty);
                }
                if trimmed.contains('#') {
                    return Err(IdError::ReservedCharacter);
                }
                Ok(Self(trimmed.to_string()))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

document_id_type!(CustomerId, "A customer identifier (document ID of the customer record).");
document_id_type!(EntityId, "A billing-entity identifier.\n\nInvoice adjustments are isolated per billing entity.");

/// A reserved-capacity order identifier.
///
/// Order IDs are stable across runs and act as the final allocation tie-break.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(i64);

impl OrderId {
    /// Create an order ID from its numeric value.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Return the numeric value.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl From<i64> for OrderId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl FromStr for OrderId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|_| IdError::InvalidOrderId)
    }
}

impl fmt::Debug for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrderId({})", self.0)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An invoice-adjustment identifier using ULID for time-ordering.
///
/// Because ULIDs sort by creation time, the smallest ID among records created in
/// the same millisecond is still a stable, deterministic choice.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AdjustmentId(Ulid);

impl AdjustmentId {
    /// Create a new `AdjustmentId` from a ULID.
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// Generate a new `AdjustmentId` with the current timestamp.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    /// Return the underlying ULID.
    #[must_use]
    pub const fn as_ulid(&self) -> &Ulid {
        &self.0
    }

    /// Return the bytes of the ULID (16 bytes).
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 16] {
        self.0.to_bytes()
    }

    /// Create an `AdjustmentId` from bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Ulid::from_bytes(bytes))
    }
}

impl FromStr for AdjustmentId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ulid = Ulid::from_string(s).map_err(|_| IdError::InvalidUlid)?;
        Ok(Self(ulid))
    }
}

impl fmt::Debug for AdjustmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AdjustmentId({})", self.0)
    }
}

impl fmt::Display for AdjustmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for AdjustmentId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AdjustmentId> for String {
    fn from(id: AdjustmentId) -> Self {
        id.0.to_string()
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is empty.
    #[error("identifier is empty")]
    Empty,

    /// The input contains a character reserved for composite keys.
    #[error("identifier contains reserved character '#'")]
    ReservedCharacter,

    /// The input is not a valid integer order ID.
    #[error("invalid order ID")]
    InvalidOrderId,

    /// The input is not a valid ULID.
    #[error("invalid ULID format")]
    InvalidUlid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_id_rejects_empty() {
        assert_eq!("  ".parse::<CustomerId>(), Err(IdError::Empty));
    }

    #[test]
    fn entity_id_rejects_key_separator() {
        assert_eq!(
            "ent#1".parse::<EntityId>(),
            Err(IdError::ReservedCharacter)
        );
    }

    #[test]
    fn customer_id_serde_json() {
        let id: CustomerId = "cust-42".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        let parsed: CustomerId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn order_id_orders_numerically() {
        assert!(OrderId::new(9) < OrderId::new(10));
        assert_eq!("5001".parse::<OrderId>().unwrap(), OrderId::new(5001));
        assert_eq!("x".parse::<OrderId>(), Err(IdError::InvalidOrderId));
    }

    #[test]
    fn adjustment_id_roundtrip() {
        let id = AdjustmentId::generate();
        let parsed = AdjustmentId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert_eq!(AdjustmentId::from_bytes(id.to_bytes()), id);
    }
}
