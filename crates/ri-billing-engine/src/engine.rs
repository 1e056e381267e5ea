//! Per-customer attribution run.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

use ri_billing_core::{
    allocate, month_to_date_cutoff, qualify, select_adjustment, ActiveOrderCounts,
    AdjustmentFilter, AllocationGroupKey, AllocationWindow, CustomerId, InvoiceAdjustment, Order,
    OrderId, OrderStatus, Rollup, RollupKey,
};
use ri_billing_store::{AutomaticWriteBatch, CommitFailure, Store, WriteOp};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::line_items::{line_item_instant, BillingLineItem, BillingLineItemSink};
use crate::report::{UsageQuery, UsageReportSource};
use crate::summary::RunSummary;

/// Runs allocation, qualification, rollup and finalization for one customer.
pub struct AttributionEngine {
    store: Arc<dyn Store>,
    reports: Arc<dyn UsageReportSource>,
    line_items: Option<Arc<dyn BillingLineItemSink>>,
    config: EngineConfig,
}

/// Mutable bookkeeping of one run.
struct Run {
    summary: RunSummary,
    failures: Vec<CommitFailure>,
}

impl Run {
    fn record_failures(&mut self, failures: Vec<CommitFailure>) {
        self.summary.failed_items += failures
            .iter()
            .map(|failure| failure.operations.len())
            .sum::<usize>();
        self.failures.extend(failures);
    }
}

impl AttributionEngine {
    /// Create an engine without a billing line-item sink.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        reports: Arc<dyn UsageReportSource>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            reports,
            line_items: None,
            config,
        }
    }

    /// Send the monthly net amounts of every run to `sink`.
    #[must_use]
    pub fn with_line_item_sink(mut self, sink: Arc<dyn BillingLineItemSink>) -> Self {
        self.line_items = Some(sink);
        self
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run attribution for `customer` as of `now`.
    ///
    /// Orders with missing data are skipped and groups whose report cannot be
    /// fetched or parsed keep their previous results; both are counted in the
    /// returned summary.
    ///
    /// # Errors
    ///
    /// - `EngineError::Config` if the configured windows are out of range.
    /// - `EngineError::Store` if reading orders, accounts or adjustments fails.
    /// - `EngineError::Commit` if any write failed; it carries the run summary.
    pub async fn run_customer(
        &self,
        customer: &CustomerId,
        now: DateTime<Utc>,
    ) -> Result<RunSummary> {
        let usage_delay = self.config.usage_delay()?;
        let cutoff = month_to_date_cutoff(now, usage_delay);
        let window = AllocationWindow {
            cutoff,
            now,
            lookback: self.config.lookback()?,
        };
        let mut run = Run {
            summary: RunSummary::new(customer.clone()),
            failures: Vec::new(),
        };

        info!(customer_id = %customer, cutoff = %cutoff, "Starting attribution run");

        let mut orders = self
            .store
            .list_orders(customer, Some(OrderStatus::Active))?;
        run.summary.orders_loaded = orders.len();

        if self.config.retire_expired_orders {
            let grace = self.config.retirement_grace()?;
            self.retire_expired(&mut orders, now, usage_delay, grace, &mut run);
        }

        let (counts, groups) = Self::group_orders(customer, orders, &mut run);

        let accounts = self.store.customer_accounts(customer)?;
        if accounts.is_empty() {
            warn!(customer_id = %customer, "No eligible accounts recorded for customer");
        }

        let mut rollup = Rollup::new();
        for (key, group_orders) in groups {
            let size_flexible = group_orders
                .first()
                .map_or(true, |order| order.config.is_size_flexible());
            let query = UsageQuery::for_group(customer, &key, size_flexible, &accounts);

            let attributed = match self
                .attribute_group(&key, &query, group_orders.clone(), &window)
                .await
            {
                Ok(attributed) => {
                    run.summary.groups_processed += 1;
                    run.summary.orders_processed += attributed.len();
                    let unsaved = self.write_costs(&attributed, &mut run);
                    if !unsaved.is_empty() {
                        warn!(
                            customer_id = %customer,
                            group = %key,
                            order_ids = ?unsaved,
                            "Order costs not saved, rolling up the computed aggregates"
                        );
                    }
                    attributed
                }
                Err(e) => {
                    error!(
                        customer_id = %customer,
                        group = %key,
                        error = %e,
                        "Allocation group failed, keeping previous results"
                    );
                    run.summary.groups_failed += 1;
                    run.summary.failed_items += 1;
                    group_orders
                }
            };

            for order in &attributed {
                rollup.add_order(order)?;
            }
        }

        self.write_adjustments(&rollup, now, &mut run)?;
        self.schedule_line_items(customer, &rollup, now, cutoff, &mut run)
            .await;
        self.finalize(&counts, &mut run)?;

        let Run { summary, failures } = run;
        info!(
            customer_id = %customer,
            groups_processed = summary.groups_processed,
            groups_failed = summary.groups_failed,
            orders_processed = summary.orders_processed,
            orders_skipped = summary.orders_skipped,
            adjustments_created = summary.adjustments_created,
            adjustments_updated = summary.adjustments_updated,
            adjustments_finalized = summary.adjustments_finalized,
            failed_items = summary.failed_items,
            "Attribution run finished"
        );

        if failures.is_empty() {
            Ok(summary)
        } else {
            Err(EngineError::Commit {
                failures,
                summary: Box::new(summary),
            })
        }
    }

    /// Retire active orders whose window and grace period have passed.
    fn retire_expired(
        &self,
        orders: &mut [Order],
        now: DateTime<Utc>,
        usage_delay: Duration,
        grace: Duration,
        run: &mut Run,
    ) {
        for order in orders
            .iter_mut()
            .filter(|order| order.retirement_due(now, usage_delay, grace))
        {
            let op = WriteOp::UpdateOrderStatus {
                order_id: order.id,
                expected_updated_at: order.updated_at,
                status: OrderStatus::Retired,
            };

            match self.store.commit(std::slice::from_ref(&op)) {
                Ok(()) => {
                    info!(order_id = %order.id, end_date = %order.config.end_date, "Order retired");
                    order.status = OrderStatus::Retired;
                    run.summary.orders_retired += 1;
                }
                Err(e) => {
                    error!(order_id = %order.id, error = %e, "Failed to retire order");
                    run.record_failures(vec![CommitFailure {
                        operations: vec![op.to_string()],
                        error: e,
                    }]);
                }
            }
        }
    }

    /// Count active orders per rollup key and group the attributable ones.
    fn group_orders(
        customer: &CustomerId,
        orders: Vec<Order>,
        run: &mut Run,
    ) -> (ActiveOrderCounts, BTreeMap<AllocationGroupKey, Vec<Order>>) {
        let mut counts = ActiveOrderCounts::new();
        let mut groups: BTreeMap<AllocationGroupKey, Vec<Order>> = BTreeMap::new();

        for mut order in orders {
            let key = match RollupKey::for_order(&order) {
                Ok(key) => key,
                Err(e) => {
                    error!(customer_id = %customer, order_id = %order.id, error = %e, "Order skipped");
                    run.summary.orders_skipped += 1;
                    continue;
                }
            };

            let active = order.is_active();
            counts.record(key, active);
            if !active {
                continue;
            }

            if let Err(e) = order
                .fill_normalized_units()
                .and_then(|()| order.validate_for_attribution())
            {
                error!(customer_id = %customer, order_id = %order.id, error = %e, "Order skipped");
                run.summary.orders_skipped += 1;
                continue;
            }

            groups
                .entry(AllocationGroupKey::for_order(&order))
                .or_default()
                .push(order);
        }

        (counts, groups)
    }

    /// Fetch the group's report, then allocate and qualify its orders.
    async fn attribute_group(
        &self,
        key: &AllocationGroupKey,
        query: &UsageQuery,
        mut orders: Vec<Order>,
        window: &AllocationWindow,
    ) -> Result<Vec<Order>> {
        let report = self.reports.fetch(query).await?;
        debug!(
            group = %key,
            orders = orders.len(),
            samples = report.samples.len(),
            "Usage report fetched"
        );

        allocate(&mut orders, &report, window, key)?;
        qualify(&mut orders, window.cutoff, self.config.hours_per_day)?;
        Ok(orders)
    }

    /// Persist the utilization and month-to-date aggregates of a group.
    /// Write each order's aggregates back; returns the orders that were not saved.
    fn write_costs(&self, orders: &[Order], run: &mut Run) -> Vec<OrderId> {
        let mut batch = AutomaticWriteBatch::new(self.store.as_ref(), self.config.batch_limit);
        let mut written = Vec::with_capacity(orders.len());
        for order in orders {
            if let Some(autopilot) = &order.autopilot {
                let op = WriteOp::UpdateOrderCosts {
                    order_id: order.id,
                    expected_updated_at: order.updated_at,
                    autopilot: autopilot.clone(),
                };
                written.push((order.id, op.to_string()));
                batch.push(op);
            }
        }

        let failures = batch.commit();
        let unsaved = unsaved_orders(&written, &failures);
        run.record_failures(failures);
        unsaved
    }

    fn find_adjustment(&self, key: &RollupKey) -> Result<Option<InvoiceAdjustment>> {
        let filter = AdjustmentFilter::for_key(self.config.adjustment_details.clone(), key);
        let matches = self.store.find_adjustments(&filter)?;
        let selected = select_adjustment(&matches).cloned();

        if matches.len() > 1 {
            if let Some(adjustment) = &selected {
                error!(
                    rollup_key = %key,
                    matches = matches.len(),
                    adjustment_id = %adjustment.id,
                    "Multiple invoice adjustments match, using the earliest"
                );
            }
        }

        Ok(selected)
    }

    /// Create or update the adjustment of every rollup key.
    fn write_adjustments(&self, rollup: &Rollup, now: DateTime<Utc>, run: &mut Run) -> Result<()> {
        let mut batch = AutomaticWriteBatch::new(self.store.as_ref(), self.config.batch_limit);

        for (key, amount) in rollup.adjustments() {
            if let Some(existing) = self.find_adjustment(key)? {
                debug!(
                    rollup_key = %key,
                    adjustment_id = %existing.id,
                    old_amount = existing.amount,
                    new_amount = amount,
                    "Updating invoice adjustment"
                );
                batch.push(WriteOp::UpdateAdjustmentAmount {
                    id: existing.id,
                    amount,
                });
                run.summary.adjustments_updated += 1;
            } else {
                let adjustment = InvoiceAdjustment::new(
                    key,
                    self.config.adjustment_details.clone(),
                    self.config.adjustment_description.clone(),
                    self.config.adjustment_currency.clone(),
                    amount,
                    now,
                );
                debug!(
                    rollup_key = %key,
                    adjustment_id = %adjustment.id,
                    amount,
                    "Creating invoice adjustment"
                );
                batch.push(WriteOp::CreateAdjustment(adjustment));
                run.summary.adjustments_created += 1;
            }
        }

        run.record_failures(batch.commit());
        Ok(())
    }

    /// Hand the monthly net amounts to the line-item sink, if any.
    async fn schedule_line_items(
        &self,
        customer: &CustomerId,
        rollup: &Rollup,
        now: DateTime<Utc>,
        cutoff: DateTime<Utc>,
        run: &mut Run,
    ) {
        let Some(sink) = &self.line_items else {
            return;
        };

        for (month, amount) in rollup.by_month() {
            let Some(time_instance) = line_item_instant(*month, now, cutoff) else {
                debug!(customer_id = %customer, month = %month, "No usage yet this month, line item not sent");
                continue;
            };

            let item = BillingLineItem {
                customer: customer.clone(),
                month: *month,
                amount: *amount,
                time_instance,
            };

            match sink.schedule(&item).await {
                Ok(()) => run.summary.line_items_scheduled += 1,
                Err(e) => {
                    error!(customer_id = %customer, month = %month, error = %e, "Failed to schedule billing line item");
                    run.summary.failed_items += 1;
                }
            }
        }
    }

    /// Finalize the adjustments of keys without active orders.
    fn finalize(&self, counts: &ActiveOrderCounts, run: &mut Run) -> Result<()> {
        let mut batch = AutomaticWriteBatch::new(self.store.as_ref(), self.config.batch_limit);

        for key in counts.finalizable() {
            let Some(adjustment) = self.find_adjustment(key)? else {
                error!(rollup_key = %key, "No invoice adjustment to finalize");
                continue;
            };
            if adjustment.finalized {
                continue;
            }

            debug!(rollup_key = %key, adjustment_id = %adjustment.id, "Finalizing invoice adjustment");
            batch.push(WriteOp::FinalizeAdjustment { id: adjustment.id });
            run.summary.adjustments_finalized += 1;
        }

        run.record_failures(batch.commit());
        Ok(())
    }
}

/// Orders whose operation description appears in a failed chunk.
fn unsaved_orders(written: &[(OrderId, String)], failures: &[CommitFailure]) -> Vec<OrderId> {
    written
        .iter()
        .filter(|(_, op)| {
            failures
                .iter()
                .any(|failure| failure.operations.iter().any(|failed| failed == op))
        })
        .map(|(id, _)| *id)
        .collect()
}
