//! API handlers.

pub mod adjustments;
pub mod attribution;
pub mod health;
