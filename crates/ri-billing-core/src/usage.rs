//! Hourly usage reports.
//!
//! A report covers one allocation group. Sample 0 is the running total of the
//! whole range and carries no hour label; hourly samples follow in time order.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AttributionError, Result};
use crate::time::HOUR_LABEL_FORMAT;

/// One labelled sample of aggregate usage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSample {
    /// Hour label (`"YYYY-MM-DD HH:MM"`), or the total's name for sample 0.
    pub label: String,

    /// Aggregate usage in normalized units.
    pub quantity: f64,

    /// Whether the reporting service flagged this sample as excluded.
    #[serde(default)]
    pub excluded: bool,
}

impl UsageSample {
    /// Create a sample that is not excluded.
    #[must_use]
    pub fn new(label: impl Into<String>, quantity: f64) -> Self {
        Self {
            label: label.into(),
            quantity,
            excluded: false,
        }
    }

    /// Parse the hour label as a UTC instant.
    ///
    /// # Errors
    ///
    /// Returns the underlying `chrono::ParseError` if the label is malformed.
    pub fn hour(&self) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
        NaiveDateTime::parse_from_str(&self.label, HOUR_LABEL_FORMAT).map(|naive| naive.and_utc())
    }
}

/// Hourly usage of one allocation group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageReport {
    /// Samples, including the leading total.
    pub samples: Vec<UsageSample>,
}

/// Wire shape of a single-dimension analytics report.
#[derive(Debug, Deserialize)]
struct SingleDimensionReport {
    #[serde(default)]
    dimensions: Vec<BTreeMap<String, Vec<DimensionMember>>>,
    #[serde(default)]
    data: Vec<Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct DimensionMember {
    name: String,
    #[serde(default)]
    excluded: bool,
}

impl UsageReport {
    /// Build a report from the running total and the hourly samples.
    #[must_use]
    pub fn with_total(total: f64, hourly: impl IntoIterator<Item = UsageSample>) -> Self {
        let mut samples = vec![UsageSample::new("total", total)];
        samples.extend(hourly);
        Self { samples }
    }

    /// A report without any data rows.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decode a single-dimension `time` report.
    ///
    /// # Errors
    ///
    /// Returns `AttributionError::InvalidReport` if the JSON is malformed, the
    /// `time` dimension is missing, or the data rows do not line up with it.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        let raw: SingleDimensionReport = serde_json::from_slice(body)
            .map_err(|e| AttributionError::InvalidReport(e.to_string()))?;
        Self::from_single_dimension(raw)
    }

    fn from_single_dimension(raw: SingleDimensionReport) -> Result<Self> {
        if raw.data.is_empty() {
            return Ok(Self::empty());
        }

        let members = raw
            .dimensions
            .into_iter()
            .next()
            .and_then(|mut dimension| dimension.remove("time"))
            .ok_or_else(|| AttributionError::InvalidReport("missing time dimension".into()))?;

        if members.len() != raw.data.len() {
            return Err(AttributionError::InvalidReport(format!(
                "{} time labels but {} data rows",
                members.len(),
                raw.data.len()
            )));
        }

        let samples = members
            .into_iter()
            .zip(raw.data)
            .map(|(member, row)| UsageSample {
                label: member.name,
                quantity: row.first().copied().flatten().unwrap_or(0.0),
                excluded: member.excluded,
            })
            .collect();

        Ok(Self { samples })
    }

    /// Whether the report carries any data rows.
    #[must_use]
    pub fn has_data(&self) -> bool {
        !self.samples.is_empty()
    }

    /// Hourly samples, skipping the leading total.
    pub fn hourly_samples(&self) -> impl Iterator<Item = &UsageSample> {
        self.samples.iter().skip(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn decodes_single_dimension_report() {
        let body = br#"{
            "dimensions": [{"time": [
                {"name": "total"},
                {"name": "2025-01-01 00:00", "excluded": false},
                {"name": "2025-01-01 01:00", "excluded": true}
            ]}],
            "data": [[13.0], [8.0], [null]]
        }"#;

        let report = UsageReport::from_json(body).unwrap();
        assert!(report.has_data());
        assert_eq!(report.samples.len(), 3);

        let hourly: Vec<_> = report.hourly_samples().collect();
        assert_eq!(hourly.len(), 2);
        assert_eq!(hourly[0].quantity, 8.0);
        assert!(hourly[1].excluded);
        assert_eq!(hourly[1].quantity, 0.0);
    }

    #[test]
    fn empty_data_means_no_data() {
        let report = UsageReport::from_json(br#"{"dimensions": [], "data": []}"#).unwrap();
        assert!(!report.has_data());
        assert_eq!(report.hourly_samples().count(), 0);
    }

    #[test]
    fn mismatched_rows_are_rejected() {
        let body = br#"{"dimensions": [{"time": [{"name": "total"}]}], "data": [[1.0], [2.0]]}"#;
        assert!(matches!(
            UsageReport::from_json(body),
            Err(AttributionError::InvalidReport(_))
        ));
    }

    #[test]
    fn missing_time_dimension_is_rejected() {
        let body = br#"{"dimensions": [{"region": [{"name": "total"}]}], "data": [[1.0]]}"#;
        assert!(UsageReport::from_json(body).is_err());
    }

    #[test]
    fn parses_hour_label() {
        let sample = UsageSample::new("2025-01-02 11:00", 6.0);
        assert_eq!(
            sample.hour().unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 2, 11, 0, 0).unwrap()
        );
        assert!(UsageSample::new("02/01/2025 11h", 1.0).hour().is_err());
    }
}
