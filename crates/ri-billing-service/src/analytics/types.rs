//! Analytics API types.

use serde::Deserialize;

use ri_billing_engine::UsageQuery;

/// Path of the fine-grained hourly instance usage report.
pub const USAGE_REPORT_PATH: &str = "/olap_reports/usage/instance/fine_grain";

/// Error message the analytics API returns when no usage matches the filters.
pub const EMPTY_REPORT_MESSAGE: &str = "This filter combination has no members to find at this time interval (i.e. empty set). Please try a different filter set or time interval.";

/// Error body returned in place of a report.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportErrorResponse {
    /// Error message.
    pub error: String,
}

impl ReportErrorResponse {
    /// Whether the error only means that no usage was found.
    #[must_use]
    pub fn is_empty_report(&self) -> bool {
        self.error == EMPTY_REPORT_MESSAGE
    }
}

/// Query parameters of the usage report for `query`.
///
/// Measures normalized instance hours of on-demand, default-tenancy usage.
#[must_use]
pub fn usage_report_params(query: &UsageQuery) -> Vec<(&'static str, String)> {
    let family_or_type = if query.size_flexible {
        format!("EC2-Instance-Type-Family:select:{}", query.family_or_type)
    } else {
        format!("EC2-Instance-Types:select:{}", query.family_or_type)
    };

    vec![
        ("client_api_id", query.client_id.to_string()),
        ("measures[]", "nf_instances".into()),
        ("interval", "hourly".into()),
        ("dimensions[]", "time".into()),
        ("filters[]", "AWS-Tenancy:select:default".into()),
        ("filters[]", "AWS-Coverage-Type:select:OnDemand".into()),
        ("filters[]", format!("AWS-Regions:select:{}", query.region)),
        (
            "filters[]",
            format!("EC2-Operating-Systems:select:{}", query.operating_system),
        ),
        (
            "filters[]",
            format!("AWS-Account:select:{}", query.accounts.join(",")),
        ),
        ("filters[]", family_or_type),
    ]
}
