//! Storefront configuration
//!
//! Loaded from YAML into [`StorefrontConfigFile`], then validated into the resolved
//! [`StorefrontConfig`] that the rest of the crate consumes.

use std::{fs, path::Path, time::Duration};

use jiff::{civil::Time, tz::TimeZone};
use rusty_money::iso::Currency;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    checkout::hours::{ServiceHours, ServiceWindow},
    delivery::{Coordinates, DeliveryZone},
    money::{MoneyError, parse_currency},
    retry::RetryPolicy,
};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading the configuration file
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Unknown currency code
    #[error(transparent)]
    Currency(#[from] MoneyError),

    /// Unknown or unloadable time zone
    #[error("unknown time zone {name}: {source}")]
    TimeZone {
        /// Configured IANA name
        name: String,
        /// Lookup failure
        #[source]
        source: jiff::Error,
    },

    /// A service window closes at or before it opens
    #[error("service window for {0} must open before it closes")]
    InvalidServiceWindow(&'static str),

    /// Per-item quantity cap must be at least one
    #[error("max_item_quantity must be at least 1")]
    InvalidQuantityCap,

    /// Delivery radius must be positive
    #[error("delivery radius must be positive, got {0} km")]
    InvalidDeliveryRadius(f64),
}

/// Raw configuration as written in YAML. Every field is optional and falls back
/// to the storefront defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorefrontConfigFile {
    /// ISO 4217 currency code
    pub currency: Option<String>,

    /// IANA time zone used for the working-hours gate
    pub timezone: Option<String>,

    /// Upper bound on a single line item's quantity
    pub max_item_quantity: Option<u32>,

    /// Seconds between background stock reconciliation passes
    pub reconcile_interval_secs: Option<u64>,

    /// Seconds a payment may stay pending before checkout gives up
    pub payment_timeout_secs: Option<u64>,

    /// Service hours
    pub service_hours: Option<ServiceHoursFile>,

    /// Retry policy for saving an order after payment succeeded
    pub order_retry: Option<RetryFile>,

    /// Retry policy for geolocating a delivery address
    pub geolocation_retry: Option<RetryFile>,

    /// Delivery zone; no radius check when absent
    pub delivery_zone: Option<DeliveryZoneFile>,
}

/// Raw service hours
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceHoursFile {
    /// Monday to Friday
    pub weekdays: WindowFile,

    /// Saturday and Sunday
    pub weekends: WindowFile,
}

/// Raw opening window, e.g. `opens: "07:00:00"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowFile {
    /// Local opening time (inclusive)
    pub opens: Time,

    /// Local closing time (exclusive)
    pub closes: Time,
}

/// Raw retry policy
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryFile {
    /// Total attempts
    pub max_attempts: u32,

    /// First backoff delay in milliseconds
    pub initial_backoff_ms: u64,
}

/// Raw delivery zone
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryZoneFile {
    /// Store latitude in degrees
    pub latitude: f64,

    /// Store longitude in degrees
    pub longitude: f64,

    /// Delivery radius in kilometres
    pub radius_km: f64,
}

/// Validated storefront configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Currency every price is expressed in
    pub currency: &'static Currency,

    /// Store-local time zone
    pub timezone: TimeZone,

    /// Upper bound on a single line item's quantity
    pub max_item_quantity: u32,

    /// Interval between background reconciliation passes
    pub reconcile_interval: Duration,

    /// How long a payment may stay pending
    pub payment_timeout: Duration,

    /// When checkout is open
    pub service_hours: ServiceHours,

    /// Retry policy for saving orders after payment
    pub order_retry: RetryPolicy,

    /// Retry policy for geolocation lookups
    pub geolocation_retry: RetryPolicy,

    /// Optional delivery radius around the store
    pub delivery_zone: Option<DeliveryZone>,
}

/// Default currency code
pub const DEFAULT_CURRENCY: &str = "INR";

/// Default store time zone
pub const DEFAULT_TIMEZONE: &str = "Asia/Kolkata";

/// Default per-item quantity cap
pub const DEFAULT_MAX_ITEM_QUANTITY: u32 = 10;

/// Default reconciliation interval (15 minutes)
pub const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Default payment timeout (10 minutes)
pub const DEFAULT_PAYMENT_TIMEOUT: Duration = Duration::from_secs(10 * 60);

impl StorefrontConfig {
    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or any value fails validation.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let file: StorefrontConfigFile = serde_norway::from_str(contents)?;

        Self::try_from(file)
    }

    /// Load and validate configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;

        Self::from_yaml_str(&contents)
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            currency: rusty_money::iso::INR,
            timezone: TimeZone::get(DEFAULT_TIMEZONE).unwrap_or(TimeZone::UTC),
            max_item_quantity: DEFAULT_MAX_ITEM_QUANTITY,
            reconcile_interval: DEFAULT_RECONCILE_INTERVAL,
            payment_timeout: DEFAULT_PAYMENT_TIMEOUT,
            service_hours: ServiceHours::default(),
            order_retry: RetryPolicy::default(),
            geolocation_retry: RetryPolicy::default(),
            delivery_zone: None,
        }
    }
}

impl TryFrom<StorefrontConfigFile> for StorefrontConfig {
    type Error = ConfigError;

    fn try_from(file: StorefrontConfigFile) -> Result<Self, Self::Error> {
        let currency = parse_currency(file.currency.as_deref().unwrap_or(DEFAULT_CURRENCY))?;

        let timezone_name = file
            .timezone
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());

        let timezone = TimeZone::get(&timezone_name).map_err(|source| ConfigError::TimeZone {
            name: timezone_name.clone(),
            source,
        })?;

        let max_item_quantity = file
            .max_item_quantity
            .unwrap_or(DEFAULT_MAX_ITEM_QUANTITY);

        if max_item_quantity == 0 {
            return Err(ConfigError::InvalidQuantityCap);
        }

        let service_hours = match file.service_hours {
            Some(hours) => ServiceHours {
                weekdays: window(&hours.weekdays, "weekdays")?,
                weekends: window(&hours.weekends, "weekends")?,
            },
            None => ServiceHours::default(),
        };

        let delivery_zone = file
            .delivery_zone
            .map(|zone| {
                if zone.radius_km > 0.0 {
                    Ok(DeliveryZone {
                        origin: Coordinates {
                            latitude: zone.latitude,
                            longitude: zone.longitude,
                        },
                        radius_km: zone.radius_km,
                    })
                } else {
                    Err(ConfigError::InvalidDeliveryRadius(zone.radius_km))
                }
            })
            .transpose()?;

        Ok(Self {
            currency,
            timezone,
            max_item_quantity,
            reconcile_interval: file
                .reconcile_interval_secs
                .map_or(DEFAULT_RECONCILE_INTERVAL, Duration::from_secs),
            payment_timeout: file
                .payment_timeout_secs
                .map_or(DEFAULT_PAYMENT_TIMEOUT, Duration::from_secs),
            service_hours,
            order_retry: file.order_retry.map_or_else(RetryPolicy::default, retry),
            geolocation_retry: file
                .geolocation_retry
                .map_or_else(RetryPolicy::default, retry),
            delivery_zone,
        })
    }
}

fn window(file: &WindowFile, label: &'static str) -> Result<ServiceWindow, ConfigError> {
    ServiceWindow::new(file.opens, file.closes).ok_or(ConfigError::InvalidServiceWindow(label))
}

fn retry(file: RetryFile) -> RetryPolicy {
    RetryPolicy {
        max_attempts: file.max_attempts,
        initial_backoff: Duration::from_millis(file.initial_backoff_ms),
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::time;
    use rusty_money::iso::{INR, USD};
    use testresult::TestResult;

    use super::*;

    #[test]
    fn empty_document_uses_defaults() -> TestResult {
        let config = StorefrontConfig::from_yaml_str("{}")?;

        assert_eq!(config.currency, INR);
        assert_eq!(config.max_item_quantity, 10);
        assert_eq!(config.reconcile_interval, Duration::from_secs(900));
        assert_eq!(config.service_hours, ServiceHours::default());
        assert_eq!(config.order_retry, RetryPolicy::default());
        assert!(config.delivery_zone.is_none());

        Ok(())
    }

    #[test]
    fn parses_full_document() -> TestResult {
        let config = StorefrontConfig::from_yaml_str(
            r#"
currency: usd
timezone: America/New_York
max_item_quantity: 6
reconcile_interval_secs: 60
payment_timeout_secs: 120
service_hours:
  weekdays: { opens: "06:30:00", closes: "21:00:00" }
  weekends: { opens: "09:00:00", closes: "17:00:00" }
order_retry: { max_attempts: 3, initial_backoff_ms: 250 }
delivery_zone: { latitude: 40.7, longitude: -74.0, radius_km: 8.5 }
"#,
        )?;

        assert_eq!(config.currency, USD);
        assert_eq!(config.max_item_quantity, 6);
        assert_eq!(config.payment_timeout, Duration::from_secs(120));
        assert_eq!(config.service_hours.weekdays.opens(), time(6, 30, 0, 0));
        assert_eq!(config.service_hours.weekends.closes(), time(17, 0, 0, 0));
        assert_eq!(config.order_retry.max_attempts, 3);
        assert_eq!(config.order_retry.initial_backoff, Duration::from_millis(250));
        assert_eq!(config.geolocation_retry, RetryPolicy::default());
        assert!(config.delivery_zone.is_some());

        Ok(())
    }

    #[test]
    fn rejects_inverted_service_window() {
        let result = StorefrontConfig::from_yaml_str(
            r#"
service_hours:
  weekdays: { opens: "20:00:00", closes: "07:00:00" }
  weekends: { opens: "08:00:00", closes: "19:00:00" }
"#,
        );

        assert!(matches!(
            result,
            Err(ConfigError::InvalidServiceWindow("weekdays"))
        ));
    }

    #[test]
    fn rejects_unknown_currency_and_timezone() {
        assert!(matches!(
            StorefrontConfig::from_yaml_str("currency: XYZ"),
            Err(ConfigError::Currency(MoneyError::UnknownCurrency(_)))
        ));
        assert!(matches!(
            StorefrontConfig::from_yaml_str("timezone: Mars/Olympus_Mons"),
            Err(ConfigError::TimeZone { .. })
        ));
    }

    #[test]
    fn rejects_zero_quantity_cap_and_unknown_fields() {
        assert!(matches!(
            StorefrontConfig::from_yaml_str("max_item_quantity: 0"),
            Err(ConfigError::InvalidQuantityCap)
        ));
        assert!(matches!(
            StorefrontConfig::from_yaml_str("tax_rate: 0.1"),
            Err(ConfigError::Yaml(_))
        ));
    }
}
