//! Usage report sources.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ri_billing_core::{AllocationGroupKey, CustomerId, UsageReport};

use crate::error::ReportError;

/// Filters of one usage-report query, derived from an allocation group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageQuery {
    /// Customer the report is for.
    pub customer: CustomerId,
    /// Analytics client identifier.
    pub client_id: i64,
    /// Cloud region.
    pub region: String,
    /// Instance family (size-flexible groups) or exact instance type.
    pub family_or_type: String,
    /// Whether `family_or_type` names a family.
    pub size_flexible: bool,
    /// Operating system.
    pub operating_system: String,
    /// Cloud accounts whose usage is eligible.
    pub accounts: Vec<String>,
}

impl UsageQuery {
    /// Build the query for an allocation group.
    #[must_use]
    pub fn for_group(
        customer: &CustomerId,
        group: &AllocationGroupKey,
        size_flexible: bool,
        accounts: &[String],
    ) -> Self {
        Self {
            customer: customer.clone(),
            client_id: group.client_id,
            region: group.region.clone(),
            family_or_type: group.family_or_type.clone(),
            size_flexible,
            operating_system: group.operating_system.clone(),
            accounts: accounts.to_vec(),
        }
    }
}

/// Supplies the hourly usage report of an allocation group.
#[async_trait]
pub trait UsageReportSource: Send + Sync {
    /// Fetch the report matching `query`.
    ///
    /// A report without data rows is a valid answer, not an error.
    async fn fetch(&self, query: &UsageQuery) -> Result<UsageReport, ReportError>;
}

/// Report source serving fixed reports keyed by family or instance type.
///
/// Unknown keys get an empty report. Every query is recorded.
#[derive(Debug, Default)]
pub struct StaticReports {
    reports: HashMap<String, Result<UsageReport, String>>,
    queries: Mutex<Vec<UsageQuery>>,
}

impl StaticReports {
    /// Create a source with no reports.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `report` for `family_or_type`.
    #[must_use]
    pub fn with_report(mut self, family_or_type: impl Into<String>, report: UsageReport) -> Self {
        self.reports.insert(family_or_type.into(), Ok(report));
        self
    }

    /// Fail every query for `family_or_type`.
    #[must_use]
    pub fn with_failure(
        mut self,
        family_or_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.reports
            .insert(family_or_type.into(), Err(message.into()));
        self
    }

    /// Queries received so far.
    #[must_use]
    pub fn queries(&self) -> Vec<UsageQuery> {
        self.queries
            .lock()
            .map(|queries| queries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl UsageReportSource for StaticReports {
    async fn fetch(&self, query: &UsageQuery) -> Result<UsageReport, ReportError> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.clone());
        }

        match self.reports.get(&query.family_or_type) {
            Some(Ok(report)) => Ok(report.clone()),
            Some(Err(message)) => Err(ReportError::Unavailable(message.clone())),
            None => Ok(UsageReport::empty()),
        }
    }
}
