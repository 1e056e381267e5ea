//! In-memory storage implementation.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use ri_billing_core::{
    AdjustmentFilter, AdjustmentId, CustomerId, InvoiceAdjustment, Order, OrderId, OrderStatus,
};

use crate::error::{Result, StoreError};
use crate::ops::{stage, WriteOp};
use crate::Store;

#[derive(Debug, Default)]
struct State {
    orders: BTreeMap<OrderId, Order>,
    adjustments: BTreeMap<AdjustmentId, InvoiceAdjustment>,
    accounts: HashMap<CustomerId, Vec<String>>,
}

/// Process-local storage backed by ordered maps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::Database("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::Database("memory store lock poisoned".into()))
    }
}

impl Store for MemoryStore {
    fn put_order(&self, order: &Order) -> Result<()> {
        self.write()?.orders.insert(order.id, order.clone());
        Ok(())
    }

    fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.read()?.orders.get(&id).cloned())
    }

    fn list_orders(
        &self,
        customer: &CustomerId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        Ok(self
            .read()?
            .orders
            .values()
            .filter(|order| &order.customer == customer)
            .filter(|order| status.map_or(true, |status| order.status == status))
            .cloned()
            .collect())
    }

    fn put_customer_accounts(&self, customer: &CustomerId, accounts: &[String]) -> Result<()> {
        self.write()?
            .accounts
            .insert(customer.clone(), accounts.to_vec());
        Ok(())
    }

    fn customer_accounts(&self, customer: &CustomerId) -> Result<Vec<String>> {
        Ok(self
            .read()?
            .accounts
            .get(customer)
            .cloned()
            .unwrap_or_default())
    }

    fn get_adjustment(&self, id: &AdjustmentId) -> Result<Option<InvoiceAdjustment>> {
        Ok(self.read()?.adjustments.get(id).cloned())
    }

    fn find_adjustments(&self, filter: &AdjustmentFilter) -> Result<Vec<InvoiceAdjustment>> {
        Ok(self
            .read()?
            .adjustments
            .values()
            .filter(|adjustment| filter.matches(adjustment))
            .cloned()
            .collect())
    }

    fn list_adjustments(&self, customer: &CustomerId) -> Result<Vec<InvoiceAdjustment>> {
        Ok(self
            .read()?
            .adjustments
            .values()
            .filter(|adjustment| &adjustment.customer == customer)
            .cloned()
            .collect())
    }

    fn commit(&self, ops: &[WriteOp]) -> Result<()> {
        let mut state = self.write()?;

        let staged = stage(
            ops,
            Utc::now(),
            |id| Ok(state.orders.get(&id).cloned()),
            |id| Ok(state.adjustments.get(id).cloned()),
        )?;

        state.orders.extend(staged.orders);
        state.adjustments.extend(staged.adjustments);
        Ok(())
    }
}
