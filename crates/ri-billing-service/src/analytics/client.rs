//! Analytics API client implementation.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use ri_billing_core::{AttributionError, UsageReport};
use ri_billing_engine::{ReportError, UsageQuery, UsageReportSource};

use super::types::{usage_report_params, ReportErrorResponse, USAGE_REPORT_PATH};

/// Error type for analytics operations.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Analytics API returned an error.
    #[error("analytics API error: {status} - {error}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message.
        error: String,
    },

    /// The report body could not be decoded.
    #[error("report error: {0}")]
    Report(#[from] AttributionError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Analytics API client.
#[derive(Debug, Clone)]
pub struct AnalyticsClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl AnalyticsClient {
    /// Create a new analytics client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Analytics API URL (e.g., `"https://analytics.example.com/api"`)
    /// * `api_key` - Analytics API key
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, AnalyticsError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(AnalyticsError::Configuration("API key is empty".into()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Fetch the hourly usage report for one allocation group.
    ///
    /// An "empty set" answer from the API is returned as an empty report.
    pub async fn usage_report(&self, query: &UsageQuery) -> Result<UsageReport, AnalyticsError> {
        let url = format!("{}{}", self.base_url, USAGE_REPORT_PATH);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .query(&[("api_key", self.api_key.as_str())])
            .query(&usage_report_params(query))
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        // Errors come back either with an error status or as a 200 with an error body
        if let Ok(error) = serde_json::from_slice::<ReportErrorResponse>(&body) {
            if error.is_empty_report() {
                tracing::debug!(
                    client_id = query.client_id,
                    family_or_type = %query.family_or_type,
                    "Analytics returned an empty set"
                );
                return Ok(UsageReport::empty());
            }
            return Err(AnalyticsError::Api {
                status: status.as_u16(),
                error: error.error,
            });
        }

        if !status.is_success() {
            return Err(AnalyticsError::Api {
                status: status.as_u16(),
                error: format!("HTTP {status}"),
            });
        }

        Ok(UsageReport::from_json(&body)?)
    }
}

#[async_trait]
impl UsageReportSource for AnalyticsClient {
    async fn fetch(&self, query: &UsageQuery) -> Result<UsageReport, ReportError> {
        self.usage_report(query).await.map_err(|e| match e {
            AnalyticsError::Report(e) => ReportError::Invalid(e),
            other => ReportError::Unavailable(other.to_string()),
        })
    }
}
