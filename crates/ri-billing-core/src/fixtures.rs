//! Shared builders for unit tests.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::group::AllocationGroupKey;
use crate::ids::OrderId;
use crate::order::{NormalizedUnits, Order, OrderConfig, OrderPricing, OrderStatus};
use crate::usage::{UsageReport, UsageSample};

pub const SAVINGS_RATE: f64 = 0.0050;
pub const FLEXIBLE_RATE: f64 = 0.0150;
pub const TOLERANCE: f64 = 1e-10;

pub fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

/// Last representable millisecond of `(y, m, d)`.
pub fn end_of_day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    at(y, m, d, 0) + Duration::days(1) - Duration::milliseconds(1)
}

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
        customer: "cust-1".parse().unwrap(),
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
            payer_account_id: Some("999988887777".into()),
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

pub fn group_key(orders: &[Order]) -> AllocationGroupKey {
    AllocationGroupKey::for_order(&orders[0])
}

/// Three days of usage at 8 units for hours 00..02 and 6 units at 11:00; day
/// one also has 6 units at 12:00. A sample on day four lies past the cutoff.
pub fn report_with(high: f64, low: f64) -> UsageReport {
    let mut hourly = Vec::new();
    for day in 1..=3 {
        for hour in 0..3 {
            hourly.push(UsageSample::new(format!("2025-01-0{day} 0{hour}:00"), high));
        }
        hourly.push(UsageSample::new(format!("2025-01-0{day} 11:00"), low));
        if day == 1 {
            hourly.push(UsageSample::new("2025-01-01 12:00", low));
        }
    }
    hourly.push(UsageSample::new("2025-01-04 15:00", 4.0));

    let total = hourly.iter().map(|s| s.quantity).sum();
    UsageReport::with_total(total, hourly)
}

pub fn report() -> UsageReport {
    report_with(8.0, 6.0)
}

/// `now` whose cutoff is 2025-01-04 00:00.
pub fn now() -> DateTime<Utc> {
    at(2025, 1, 7, 8)
}

pub fn cutoff() -> DateTime<Utc> {
    at(2025, 1, 4, 0)
}
