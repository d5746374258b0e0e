//! Configuration structures for the tierwatch system.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote pricing API.
    pub api: ApiConfig,
    /// Retry/backoff policy for API calls.
    pub retry: RetryConfig,
    /// Historical storage.
    pub storage: StorageConfig,
    /// Price alert detection.
    pub alerts: AlertConfig,
    /// Tier assignment.
    pub tiers: TierConfig,
}

impl Config {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {e}", path.display())))?;
        let config: Config = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Apply `TIERWATCH_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("TIERWATCH_API_URL") {
            self.api.endpoint = url;
        }
        if let Some(market) = lookup("TIERWATCH_MARKET") {
            self.api.market = market;
        }
        if let Some(currency) = lookup("TIERWATCH_CURRENCY") {
            self.api.currency = currency;
        }
        if let Some(dir) = lookup("TIERWATCH_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(attempts) = lookup("TIERWATCH_MAX_ATTEMPTS") {
            self.retry.max_attempts = attempts.parse().map_err(|_| {
                Error::config(format!("TIERWATCH_MAX_ATTEMPTS must be an integer, got {attempts}"))
            })?;
        }
        Ok(())
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.api.endpoint.is_empty() {
            return Err(Error::config("api.endpoint must not be empty"));
        }
        if self.api.timeout_secs == 0 {
            return Err(Error::config("api.timeout_secs must be greater than 0"));
        }
        if self.api.max_span_days == 0 {
            return Err(Error::config("api.max_span_days must be greater than 0"));
        }
        self.retry.validate()?;
        if !(self.alerts.threshold_pct > 0.0) {
            return Err(Error::config("alerts.threshold_pct must be positive"));
        }
        if let Some(bands) = &self.tiers.custom_bands {
            if bands.len() != 5 {
                return Err(Error::config(format!(
                    "tiers.custom_bands needs 5 bands, got {}",
                    bands.len()
                )));
            }
        }
        Ok(())
    }
}

/// Remote pricing API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Pricing-calendar endpoint.
    pub endpoint: String,
    /// Market code (e.g., "en-int").
    pub market: String,
    /// Currency code.
    pub currency: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Longest date span sent in a single request.
    pub max_span_days: u32,
    /// Sales channel sent in the eligibility block.
    pub sales_channel: String,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.disneylandparis.com/prices-calendar/api/v2/prices/ticket-price-calendar"
                .to_string(),
            market: "en-int".to_string(),
            currency: "EUR".to_string(),
            timeout_secs: 30,
            max_span_days: 366,
            sales_channel: "DIRECT".to_string(),
        }
    }
}

/// Retry/backoff configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Wait before the first retry (ms).
    pub base_delay_ms: u64,
    /// Growth factor applied per retry.
    pub multiplier: f64,
    /// Ceiling for any single wait (ms).
    pub max_delay_ms: u64,
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::config("retry.max_attempts must be at least 1"));
        }
        if !(self.multiplier >= 1.0) || !self.multiplier.is_finite() {
            return Err(Error::config("retry.multiplier must be a finite value >= 1"));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(Error::config("retry.base_delay_ms must not exceed retry.max_delay_ms"));
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            multiplier: 2.0,
            max_delay_ms: 30_000,
        }
    }
}

/// Historical storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for snapshots and mapped exports.
    pub data_dir: PathBuf,
    /// Snapshot retention in days.
    pub days_to_keep: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            days_to_keep: 90,
        }
    }
}

/// Price alert configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Day-over-day change (percent) that counts as a spike.
    pub threshold_pct: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self { threshold_pct: 20.0 }
    }
}

/// Tier assignment configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    /// Fixed `[lower, upper]` price bands, Low Peak first. When set, prices
    /// are classified against these bands instead of ranked by percentile.
    pub custom_bands: Option<Vec<(f64, f64)>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.market, "en-int");
        assert_eq!(config.api.currency, "EUR");
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.storage.days_to_keep, 90);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"retry": {"max_attempts": 5}, "api": {"currency": "GBP"}}"#).unwrap();
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 1_000);
        assert_eq!(config.api.currency, "GBP");
        assert_eq!(config.api.market, "en-int");
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("TIERWATCH_MARKET", "en-gb"),
            ("TIERWATCH_DATA_DIR", "/tmp/tiers"),
            ("TIERWATCH_MAX_ATTEMPTS", "4"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.api.market, "en-gb");
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/tiers"));
        assert_eq!(config.retry.max_attempts, 4);

        let mut bad = Config::default();
        let err = bad.apply_overrides(|k| (k == "TIERWATCH_MAX_ATTEMPTS").then(|| "many".to_string()));
        assert!(err.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_retry() {
        let mut config = Config::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.retry.multiplier = 0.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.retry.base_delay_ms = 60_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_custom_bands_from_json() {
        let config: Config = serde_json::from_str(
            r#"{"tiers": {"custom_bands": [[50, 70], [70, 80], [80, 90], [90, 100], [100, 150]]}}"#,
        )
        .unwrap();
        let bands = config.tiers.custom_bands.as_ref().unwrap();
        assert_eq!(bands[0], (50.0, 70.0));
        assert_eq!(bands[4], (100.0, 150.0));
        assert!(config.validate().is_ok());

        let mut short = Config::default();
        short.tiers.custom_bands = Some(vec![(50.0, 70.0)]);
        assert!(short.validate().is_err());
        assert!(Config::default().tiers.custom_bands.is_none());
    }
}
