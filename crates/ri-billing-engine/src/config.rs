//! Engine configuration.

use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Upper bound of the delay, lookback and grace windows.
const MAX_WINDOW_DAYS: i64 = 366;

/// Tunables of an attribution run.
///
/// Every field has a default, so a configuration file only needs to name the
/// values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Hours in a billable day (default: 24).
    pub hours_per_day: f64,

    /// Delay before hourly usage is considered complete (default: 72).
    ///
    /// The month-to-date cutoff is midnight of the run minus this delay.
    pub usage_data_delay_hours: i64,

    /// How far back zero-fill reaches once an order's window has closed (default: 32).
    pub empty_usage_lookback_days: i64,

    /// Operations per physical commit (default: 250).
    pub batch_limit: usize,

    /// Days after `end_date + usage delay` before an active order is retired (default: 3).
    pub retirement_grace_days: i64,

    /// Whether the run retires expired orders before grouping (default: true).
    pub retire_expired_orders: bool,

    /// Details tag identifying this engine's invoice adjustments.
    pub adjustment_details: String,

    /// Description written on newly created adjustments.
    pub adjustment_description: String,

    /// Currency of newly created adjustments.
    pub adjustment_currency: String,
}

impl EngineConfig {
    /// Load a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&contents)
    }

    /// Parse a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` if the document is not a valid configuration.
    pub fn from_json(contents: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(contents).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(self.hours_per_day > 0.0 && self.hours_per_day <= 24.0) {
            return Err(EngineError::Config(format!(
                "hours_per_day must be in (0, 24], got {}",
                self.hours_per_day
            )));
        }
        self.usage_delay()?;
        self.lookback()?;
        self.retirement_grace()?;
        if self.adjustment_details.is_empty() {
            return Err(EngineError::Config("adjustment_details must be set".into()));
        }
        Ok(())
    }

    /// Usage-data delay as a duration.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` if the delay is negative or longer than a year.
    pub fn usage_delay(&self) -> Result<Duration> {
        bounded(
            "usage_data_delay_hours",
            self.usage_data_delay_hours,
            MAX_WINDOW_DAYS * 24,
            Duration::try_hours,
        )
    }

    /// Zero-fill lookback as a duration.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` if the lookback is negative or longer than a year.
    pub fn lookback(&self) -> Result<Duration> {
        bounded(
            "empty_usage_lookback_days",
            self.empty_usage_lookback_days,
            MAX_WINDOW_DAYS,
            Duration::try_days,
        )
    }

    /// Retirement grace period as a duration.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` if the grace is negative or longer than a year.
    pub fn retirement_grace(&self) -> Result<Duration> {
        bounded(
            "retirement_grace_days",
            self.retirement_grace_days,
            MAX_WINDOW_DAYS,
            Duration::try_days,
        )
    }
}

fn bounded(
    field: &str,
    value: i64,
    max: i64,
    to_duration: fn(i64) -> Option<Duration>,
) -> Result<Duration> {
    if !(0..=max).contains(&value) {
        return Err(EngineError::Config(format!(
            "{field} must be in [0, {max}], got {value}"
        )));
    }
    to_duration(value)
        .ok_or_else(|| EngineError::Config(format!("{field} is out of range: {value}")))
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hours_per_day: 24.0,
            usage_data_delay_hours: 72,
            empty_usage_lookback_days: 32,
            batch_limit: ri_billing_store::DEFAULT_BATCH_LIMIT,
            retirement_grace_days: 3,
            retire_expired_orders: true,
            adjustment_details: "RI Savings".into(),
            adjustment_description: "Reserved Instance Savings".into(),
            adjustment_currency: "USD".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.usage_delay().unwrap(), Duration::hours(72));
        assert_eq!(config.lookback().unwrap(), Duration::days(32));
        assert_eq!(config.retirement_grace().unwrap(), Duration::days(3));
        assert_eq!(config.batch_limit, 250);
        assert!(config.retire_expired_orders);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{"hours_per_day": 5, "batch_limit": 10}"#).unwrap();
        assert!((config.hours_per_day - 5.0).abs() < f64::EPSILON);
        assert_eq!(config.batch_limit, 10);
        assert_eq!(config.adjustment_currency, "USD");
    }

    #[test]
    fn rejects_invalid_hours_per_day() {
        let result = EngineConfig::from_json(r#"{"hours_per_day": 0}"#);
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn rejects_delay_too_large_for_a_duration() {
        let result = EngineConfig::from_json(r#"{"usage_data_delay_hours": 9223372036854775807}"#);
        assert!(matches!(result, Err(EngineError::Config(_))));

        let result = EngineConfig::from_json(r#"{"empty_usage_lookback_days": 9223372036854775807}"#);
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn rejects_negative_windows() {
        for json in [
            r#"{"retirement_grace_days": -30}"#,
            r#"{"usage_data_delay_hours": -1}"#,
            r#"{"empty_usage_lookback_days": -1}"#,
        ] {
            let result = EngineConfig::from_json(json);
            assert!(matches!(result, Err(EngineError::Config(_))), "{json}");
        }
    }

    #[test]
    fn unvalidated_config_reports_instead_of_panicking() {
        let config = EngineConfig {
            usage_data_delay_hours: i64::MAX,
            retirement_grace_days: -30,
            ..EngineConfig::default()
        };
        assert!(matches!(config.usage_delay(), Err(EngineError::Config(_))));
        assert!(matches!(config.retirement_grace(), Err(EngineError::Config(_))));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let result = EngineConfig::from_file("/nonexistent/engine.json");
        assert!(matches!(result, Err(EngineError::Config(_))));
    }
}
