//! Write operations and their staging.
//!
//! Backends stage every operation of a commit against the current records
//! first and only write once the whole set applies cleanly.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};

use ri_billing_core::{AdjustmentId, Autopilot, InvoiceAdjustment, Order, OrderId, OrderStatus};

use crate::error::{Result, StoreError};

/// One write against the store.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Persist an order's utilization and month-to-date aggregates.
    UpdateOrderCosts {
        /// Order to update.
        order_id: OrderId,
        /// `updated_at` the caller read; a mismatch is a conflict.
        expected_updated_at: DateTime<Utc>,
        /// New attribution state.
        autopilot: Autopilot,
    },

    /// Change an order's lifecycle status.
    UpdateOrderStatus {
        /// Order to update.
        order_id: OrderId,
        /// `updated_at` the caller read; a mismatch is a conflict.
        expected_updated_at: DateTime<Utc>,
        /// New status.
        status: OrderStatus,
    },

    /// Insert a new invoice adjustment.
    CreateAdjustment(InvoiceAdjustment),

    /// Replace the amount of an existing adjustment.
    UpdateAdjustmentAmount {
        /// Adjustment to update.
        id: AdjustmentId,
        /// New amount.
        amount: f64,
    },

    /// Mark an existing adjustment as finalized.
    FinalizeAdjustment {
        /// Adjustment to finalize.
        id: AdjustmentId,
    },
}

impl fmt::Display for WriteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpdateOrderCosts { order_id, .. } => write!(f, "update costs of order {order_id}"),
            Self::UpdateOrderStatus {
                order_id, status, ..
            } => write!(f, "set order {order_id} {}", status.as_str()),
            Self::CreateAdjustment(adjustment) => {
                write!(f, "create adjustment {}", adjustment.id)
            }
            Self::UpdateAdjustmentAmount { id, amount } => {
                write!(f, "update adjustment {id} amount to {amount}")
            }
            Self::FinalizeAdjustment { id } => write!(f, "finalize adjustment {id}"),
        }
    }
}

/// Records changed by a commit, ready to be written.
#[derive(Debug, Default)]
pub(crate) struct Staged {
    pub orders: BTreeMap<OrderId, Order>,
    pub adjustments: BTreeMap<AdjustmentId, InvoiceAdjustment>,
}

/// Next `updated_at` token after `previous`.
fn next_token(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

/// Apply `ops` in order on top of the current records.
///
/// `load_order` and `load_adjustment` read the committed state; records already
/// touched by an earlier op in the same commit are taken from the staging area.
pub(crate) fn stage<FO, FA>(
    ops: &[WriteOp],
    now: DateTime<Utc>,
    mut load_order: FO,
    mut load_adjustment: FA,
) -> Result<Staged>
where
    FO: FnMut(OrderId) -> Result<Option<Order>>,
    FA: FnMut(&AdjustmentId) -> Result<Option<InvoiceAdjustment>>,
{
    let mut staged = Staged::default();

    for op in ops {
        match op {
            WriteOp::UpdateOrderCosts {
                order_id,
                expected_updated_at,
                autopilot,
            } => {
                let mut order = take_order(&mut staged, *order_id, &mut load_order)?;
                check_token(&order, *expected_updated_at)?;
                order.autopilot = Some(Autopilot {
                    updates: ri_billing_core::UtilizationTable::new(),
                    ..autopilot.clone()
                });
                order.updated_at = next_token(order.updated_at, now);
                staged.orders.insert(*order_id, order);
            }
            WriteOp::UpdateOrderStatus {
                order_id,
                expected_updated_at,
                status,
            } => {
                let mut order = take_order(&mut staged, *order_id, &mut load_order)?;
                check_token(&order, *expected_updated_at)?;
                order.status = *status;
                order.updated_at = next_token(order.updated_at, now);
                staged.orders.insert(*order_id, order);
            }
            WriteOp::CreateAdjustment(adjustment) => {
                let exists = staged.adjustments.contains_key(&adjustment.id)
                    || load_adjustment(&adjustment.id)?.is_some();
                if exists {
                    return Err(StoreError::Conflict {
                        entity: "invoice adjustment",
                        id: adjustment.id.to_string(),
                    });
                }
                staged.adjustments.insert(adjustment.id, adjustment.clone());
            }
            WriteOp::UpdateAdjustmentAmount { id, amount } => {
                let mut adjustment = take_adjustment(&mut staged, id, &mut load_adjustment)?;
                adjustment.amount = *amount;
                adjustment.updated_at = now;
                staged.adjustments.insert(*id, adjustment);
            }
            WriteOp::FinalizeAdjustment { id } => {
                let mut adjustment = take_adjustment(&mut staged, id, &mut load_adjustment)?;
                adjustment.finalized = true;
                adjustment.updated_at = now;
                staged.adjustments.insert(*id, adjustment);
            }
        }
    }

    Ok(staged)
}

fn take_order<FO>(staged: &mut Staged, id: OrderId, load: &mut FO) -> Result<Order>
where
    FO: FnMut(OrderId) -> Result<Option<Order>>,
{
    match staged.orders.remove(&id) {
        Some(order) => Ok(order),
        None => load(id)?.ok_or_else(|| StoreError::order_not_found(id)),
    }
}

fn take_adjustment<FA>(
    staged: &mut Staged,
    id: &AdjustmentId,
    load: &mut FA,
) -> Result<InvoiceAdjustment>
where
    FA: FnMut(&AdjustmentId) -> Result<Option<InvoiceAdjustment>>,
{
    match staged.adjustments.remove(id) {
        Some(adjustment) => Ok(adjustment),
        None => load(id)?.ok_or_else(|| StoreError::adjustment_not_found(id)),
    }
}

fn check_token(order: &Order, expected: DateTime<Utc>) -> Result<()> {
    if order.updated_at == expected {
        Ok(())
    } else {
        Err(StoreError::Conflict {
            entity: "order",
            id: order.id.to_string(),
        })
    }
}
