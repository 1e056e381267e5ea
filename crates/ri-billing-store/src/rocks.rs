//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use ri_billing_core::{
    AdjustmentFilter, AdjustmentId, CustomerId, InvoiceAdjustment, Order, OrderId, OrderStatus,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::ops::{stage, WriteOp};
use crate::schema::{all_column_families, cf};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    /// Serializes `commit` so token checks and writes are not interleaved.
    commit_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            commit_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Read a CBOR value from a column family.
    fn get_value<T: serde::de::DeserializeOwned>(&self, name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Collect the index keys under `prefix`, in key order.
    fn index_keys(&self, name: &str, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        let cf = self.cf(name)?;
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward));

        let mut found = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            found.push(key.to_vec());
        }
        Ok(found)
    }

    fn customer_adjustments(&self, customer: &CustomerId) -> Result<Vec<InvoiceAdjustment>> {
        let mut adjustments = Vec::new();
        for key in self.index_keys(cf::ADJUSTMENTS_BY_CUSTOMER, &keys::customer_prefix(customer))? {
            let Some(id) = keys::adjustment_id_from_index(&key) else {
                continue;
            };
            if let Some(adjustment) = self.get_adjustment(&id)? {
                adjustments.push(adjustment);
            }
        }
        Ok(adjustments)
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Order Operations
    // =========================================================================

    fn put_order(&self, order: &Order) -> Result<()> {
        let cf_orders = self.cf(cf::ORDERS)?;
        let cf_by_customer = self.cf(cf::ORDERS_BY_CUSTOMER)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_orders, keys::order_key(order.id), Self::serialize(order)?);
        batch.put_cf(
            &cf_by_customer,
            keys::customer_order_key(&order.customer, order.id),
            [],
        );

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        self.get_value(cf::ORDERS, &keys::order_key(id))
    }

    fn list_orders(
        &self,
        customer: &CustomerId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        let mut orders = Vec::new();
        for key in self.index_keys(cf::ORDERS_BY_CUSTOMER, &keys::customer_prefix(customer))? {
            let Some(id) = keys::order_id_from_index(&key) else {
                continue;
            };
            match self.get_order(id)? {
                Some(order) if status.map_or(true, |status| order.status == status) => {
                    orders.push(order);
                }
                _ => {}
            }
        }
        orders.sort_by_key(|order| order.id);
        Ok(orders)
    }

    // =========================================================================
    // Account Scope Operations
    // =========================================================================

    fn put_customer_accounts(&self, customer: &CustomerId, accounts: &[String]) -> Result<()> {
        let cf = self.cf(cf::CUSTOMER_ACCOUNTS)?;
        self.db
            .put_cf(
                &cf,
                keys::customer_accounts_key(customer),
                Self::serialize(&accounts)?,
            )
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn customer_accounts(&self, customer: &CustomerId) -> Result<Vec<String>> {
        Ok(self
            .get_value(cf::CUSTOMER_ACCOUNTS, &keys::customer_accounts_key(customer))?
            .unwrap_or_default())
    }

    // =========================================================================
    // Invoice Adjustment Operations
    // =========================================================================

    fn get_adjustment(&self, id: &AdjustmentId) -> Result<Option<InvoiceAdjustment>> {
        self.get_value(cf::ADJUSTMENTS, &keys::adjustment_key(id))
    }

    fn find_adjustments(&self, filter: &AdjustmentFilter) -> Result<Vec<InvoiceAdjustment>> {
        Ok(self
            .customer_adjustments(&filter.customer)?
            .into_iter()
            .filter(|adjustment| filter.matches(adjustment))
            .collect())
    }

    fn list_adjustments(&self, customer: &CustomerId) -> Result<Vec<InvoiceAdjustment>> {
        self.customer_adjustments(customer)
    }

    // =========================================================================
    // Batched Writes
    // =========================================================================

    fn commit(&self, ops: &[WriteOp]) -> Result<()> {
        let _guard = self
            .commit_lock
            .lock()
            .map_err(|_| StoreError::Database("commit lock poisoned".into()))?;

        let staged = stage(
            ops,
            Utc::now(),
            |id| self.get_order(id),
            |id| self.get_adjustment(id),
        )?;

        let cf_orders = self.cf(cf::ORDERS)?;
        let cf_adjustments = self.cf(cf::ADJUSTMENTS)?;
        let cf_adjustments_by_customer = self.cf(cf::ADJUSTMENTS_BY_CUSTOMER)?;

        let mut batch = WriteBatch::default();
        for (id, order) in &staged.orders {
            batch.put_cf(&cf_orders, keys::order_key(*id), Self::serialize(order)?);
        }
        for (id, adjustment) in &staged.adjustments {
            batch.put_cf(
                &cf_adjustments,
                keys::adjustment_key(id),
                Self::serialize(adjustment)?,
            );
            batch.put_cf(
                &cf_adjustments_by_customer,
                keys::customer_adjustment_key(&adjustment.customer, id),
                [],
            );
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}
