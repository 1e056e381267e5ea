//! Common test utilities for ri-billing service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;

use ri_billing_core::{
    CustomerId, NormalizedUnits, Order, OrderConfig, OrderId, OrderPricing, OrderStatus,
};
use ri_billing_engine::EngineConfig;
use ri_billing_service::{create_router, AppState, ServiceConfig};
use ri_billing_store::{MemoryStore, Store};

pub const CUSTOMER: &str = "cust-1";
pub const AS_OF: &str = "2025-01-07T08:00:00Z";
pub const ANALYTICS_KEY: &str = "test-analytics-key";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The store behind the server.
    pub store: Arc<MemoryStore>,
    /// The service API key for service-to-service requests.
    pub service_api_key: String,
}

impl TestHarness {
    /// Create a harness without analytics.
    pub fn new() -> Self {
        Self::with_analytics(None)
    }

    /// Create a harness whose analytics API lives at `analytics_url`.
    pub fn with_analytics(analytics_url: Option<String>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let service_api_key = "test-service-key".to_string();

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: "/tmp/ri-billing-test".into(),
            service_api_key: Some(service_api_key.clone()),
            analytics_api_key: analytics_url.as_ref().map(|_| ANALYTICS_KEY.to_string()),
            analytics_api_url: analytics_url,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            engine: EngineConfig {
                hours_per_day: 5.0,
                ..EngineConfig::default()
            },
        };

        let state = AppState::new(store.clone(), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            service_api_key,
        }
    }

    /// Store the small + large `t3` orders and the customer's account scope.
    pub fn seed_orders(&self) {
        self.store.put_order(&order(1, "t3.small", 1.0)).unwrap();
        self.store.put_order(&order(2, "t3.large", 4.0)).unwrap();
        self.store
            .put_customer_accounts(&customer(), &["111122223333".into()])
            .unwrap();
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

pub fn customer() -> CustomerId {
    CUSTOMER.parse().unwrap()
}

fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

/// An active `t3` order committed for 2025-01-01 through 2025-01-07.
pub fn order(id: i64, instance_type: &str, factor: f64) -> Order {
    Order {
        id: OrderId::new(id),
        customer: customer(),
        entity: Some("ent-1".parse().unwrap()),
        status: OrderStatus::Active,
        client_id: 1001,
        config: OrderConfig {
            region: "us-east-2".into(),
            instance_type: instance_type.into(),
            instance_family: "t3".into(),
            operating_system: "Linux/UNIX".into(),
            size_flexible: None,
            num_instances: 1,
            account_id: Some("111122223333".into()),
            payer_account_id: None,
            start_date: at(2025, 1, 1, 0),
            end_date: at(2025, 1, 8, 0) - Duration::milliseconds(1),
        },
        normalized_units: Some(NormalizedUnits::new(factor, 1)),
        pricing: Some(OrderPricing {
            savings_per_hour_normalized: 0.0050,
            flexible_normalized: 0.0150,
            on_demand_normalized: None,
        }),
        autopilot: None,
        updated_at: at(2025, 1, 1, 0),
    }
}

/// Analytics report body: three days of usage, the last sample past the cutoff.
pub fn report_body() -> serde_json::Value {
    let mut labels = vec![json!({ "name": "total" })];
    let mut data = Vec::new();
    for day in 1..=3 {
        for hour in 0..3 {
            labels.push(json!({ "name": format!("2025-01-0{day} 0{hour}:00"), "excluded": false }));
            data.push(json!([8.0]));
        }
        labels.push(json!({ "name": format!("2025-01-0{day} 11:00"), "excluded": false }));
        data.push(json!([6.0]));
        if day == 1 {
            labels.push(json!({ "name": "2025-01-01 12:00", "excluded": false }));
            data.push(json!([6.0]));
        }
    }
    labels.push(json!({ "name": "2025-01-04 15:00", "excluded": false }));
    data.push(json!([4.0]));
    data.insert(0, json!([100.0]));

    json!({
        "dimensions": [{ "time": labels }],
        "measures": [{ "name": "nf_instances", "label": "Normalized Instance Hours" }],
        "data": data,
    })
}
