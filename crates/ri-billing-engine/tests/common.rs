//! Common builders for engine integration tests.

#![allow(dead_code)] // Not every test file uses every builder

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use ri_billing_core::{
    AdjustmentFilter, AdjustmentId, CustomerId, InvoiceAdjustment, NormalizedUnits, Order,
    OrderConfig, OrderId, OrderPricing, OrderStatus, RollupKey, UsageReport, UsageSample,
};
use ri_billing_engine::{
    AttributionEngine, BillingLineItem, BillingLineItemSink, EngineConfig, LineItemError,
    StaticReports,
};
use ri_billing_store::{MemoryStore, Store, StoreError, WriteOp};

pub const SAVINGS_RATE: f64 = 0.0050;
pub const FLEXIBLE_RATE: f64 = 0.0150;
pub const TOLERANCE: f64 = 1e-10;

pub fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub fn end_of_day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    at(y, m, d, 0) + Duration::days(1) - Duration::milliseconds(1)
}

pub fn month(y: i32, m: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, 1).unwrap()
}

/// Run time whose month-to-date cutoff is 2025-01-04 00:00.
pub fn now() -> DateTime<Utc> {
    at(2025, 1, 7, 8)
}

pub fn customer() -> CustomerId {
    "cust-1".parse().unwrap()
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < TOLERANCE,
        "expected {expected}, got {actual}"
    );
}

/// Engine configuration for a five-hour synthetic day.
pub fn config() -> EngineConfig {
    EngineConfig {
        hours_per_day: 5.0,
        ..EngineConfig::default()
    }
}

/// An active `t3` order committed for 2025-01-01 through 2025-01-07.
pub fn order(id: i64, instance_type: &str, factor: f64, num_instances: u32) -> Order {
    order_in_window(
        id,
        instance_type,
        factor,
        num_instances,
        at(2025, 1, 1, 0),
        end_of_day(2025, 1, 7),
    )
}

pub fn order_in_window(
    id: i64,
    instance_type: &str,
    factor: f64,
    num_instances: u32,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
) -> Order {
    let (family, _) = instance_type.split_once('.').unwrap();
    Order {
        id: OrderId::new(id),
        customer: customer(),
        entity: Some("ent-1".parse().unwrap()),
        status: OrderStatus::Active,
        client_id: 1001,
        config: OrderConfig {
            region: "us-east-2".into(),
            instance_type: instance_type.into(),
            instance_family: family.into(),
            operating_system: "Linux/UNIX".into(),
            size_flexible: None,
            num_instances,
            account_id: Some("111122223333".into()),
            payer_account_id: None,
            start_date,
            end_date,
        },
        normalized_units: Some(NormalizedUnits::new(factor, num_instances)),
        pricing: Some(OrderPricing {
            savings_per_hour_normalized: SAVINGS_RATE,
            flexible_normalized: FLEXIBLE_RATE,
            on_demand_normalized: None,
        }),
        autopilot: None,
        updated_at: at(2025, 1, 1, 0),
    }
}

/// Three days of usage at 8 units for hours 00..02 and 6 units at 11:00; day
/// one also has 6 units at 12:00. A sample on day four lies past the cutoff.
pub fn report() -> UsageReport {
    let mut hourly = Vec::new();
    for day in 1..=3 {
        for hour in 0..3 {
            hourly.push(UsageSample::new(format!("2025-01-0{day} 0{hour}:00"), 8.0));
        }
        hourly.push(UsageSample::new(format!("2025-01-0{day} 11:00"), 6.0));
        if day == 1 {
            hourly.push(UsageSample::new("2025-01-01 12:00", 6.0));
        }
    }
    hourly.push(UsageSample::new("2025-01-04 15:00", 4.0));

    let total = hourly.iter().map(|s| s.quantity).sum();
    UsageReport::with_total(total, hourly)
}

pub fn rollup_key(end_month: NaiveDate) -> RollupKey {
    RollupKey {
        month: end_month,
        customer: customer(),
        entity: "ent-1".parse().unwrap(),
    }
}

/// Engine, store and report source wired together.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub reports: Arc<StaticReports>,
    pub engine: AttributionEngine,
}

impl Harness {
    pub fn new(orders: &[Order], reports: StaticReports) -> Self {
        Self::with_config(orders, reports, config())
    }

    pub fn with_config(orders: &[Order], reports: StaticReports, config: EngineConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        for order in orders {
            store.put_order(order).unwrap();
        }
        store
            .put_customer_accounts(&customer(), &["111122223333".into()])
            .unwrap();

        let reports = Arc::new(reports);
        let engine = AttributionEngine::new(store.clone(), reports.clone(), config);
        Self {
            store,
            reports,
            engine,
        }
    }

    pub fn stored_order(&self, id: i64) -> Order {
        self.store.get_order(OrderId::new(id)).unwrap().unwrap()
    }

    pub fn adjustments(&self) -> Vec<InvoiceAdjustment> {
        self.store.list_adjustments(&customer()).unwrap()
    }
}

/// Sink recording every line item it receives.
#[derive(Default)]
pub struct RecordingSink {
    pub items: Mutex<Vec<BillingLineItem>>,
    pub fail: bool,
}

#[async_trait]
impl BillingLineItemSink for RecordingSink {
    async fn schedule(&self, item: &BillingLineItem) -> Result<(), LineItemError> {
        if self.fail {
            return Err(LineItemError("sink offline".into()));
        }
        self.items.lock().unwrap().push(item.clone());
        Ok(())
    }
}

/// Store rejecting every commit that writes order costs.
#[derive(Default)]
pub struct CostWriteFailingStore {
    pub inner: MemoryStore,
}

impl Store for CostWriteFailingStore {
    fn put_order(&self, order: &Order) -> ri_billing_store::Result<()> {
        self.inner.put_order(order)
    }
    fn get_order(&self, id: OrderId) -> ri_billing_store::Result<Option<Order>> {
        self.inner.get_order(id)
    }
    fn list_orders(
        &self,
        customer: &CustomerId,
        status: Option<OrderStatus>,
    ) -> ri_billing_store::Result<Vec<Order>> {
        self.inner.list_orders(customer, status)
    }
    fn put_customer_accounts(
        &self,
        customer: &CustomerId,
        accounts: &[String],
    ) -> ri_billing_store::Result<()> {
        self.inner.put_customer_accounts(customer, accounts)
    }
    fn customer_accounts(&self, customer: &CustomerId) -> ri_billing_store::Result<Vec<String>> {
        self.inner.customer_accounts(customer)
    }
    fn get_adjustment(
        &self,
        id: &AdjustmentId,
    ) -> ri_billing_store::Result<Option<InvoiceAdjustment>> {
        self.inner.get_adjustment(id)
    }
    fn find_adjustments(
        &self,
        filter: &AdjustmentFilter,
    ) -> ri_billing_store::Result<Vec<InvoiceAdjustment>> {
        self.inner.find_adjustments(filter)
    }
    fn list_adjustments(
        &self,
        customer: &CustomerId,
    ) -> ri_billing_store::Result<Vec<InvoiceAdjustment>> {
        self.inner.list_adjustments(customer)
    }
    fn commit(&self, ops: &[WriteOp]) -> ri_billing_store::Result<()> {
        if ops
            .iter()
            .any(|op| matches!(op, WriteOp::UpdateOrderCosts { .. }))
        {
            return Err(StoreError::Database("disk full".into()));
        }
        self.inner.commit(ops)
    }
}
