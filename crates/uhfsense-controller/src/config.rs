//! TOML configuration.
//!
//! Every section and field is optional; missing values take the defaults
//! below.
//!
//! ```toml
//! [reader]
//! port = "COM4"
//! password = "00000000"
//! max_attempts = 5
//! read_timeout_ms = 3000
//! write_timeout_ms = 500
//!
//! [reader.inventory_area]
//! area = 2
//! start_word = 0
//! word_length = 6
//!
//! [sensor]
//! port = "COM3"
//! baud_rate = 9600
//! threshold_lux = 100.0
//!
//! [scan]
//! window_ms = 500
//! idle_ms = 1000
//! poll_interval_ms = 50
//! target_count = 100
//! max_scan_ms = 10000
//!
//! [colors]
//! "E2000017221101441890A3B4" = "GREEN"
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uhfsense_core::constants::{
    DEFAULT_ACCESS_PASSWORD, DEFAULT_IDLE_MS, DEFAULT_ILLUMINATION_THRESHOLD_LUX,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_SCAN_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_READ_TIMEOUT_MS,
    DEFAULT_READER_PORT, DEFAULT_SENSOR_BAUD_RATE, DEFAULT_SENSOR_PORT, DEFAULT_TARGET_COUNT,
    DEFAULT_WINDOW_MS, DEFAULT_WRITE_TIMEOUT_MS,
};
use uhfsense_core::{AccessPassword, InventoryArea};
use uhfsense_hardware::SerialConfig;
use uhfsense_rfid::{AccessPolicy, ContinuousCadence, ScanLimits};
use uhfsense_sensor::{ActuationPolicy, TagColorRule};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub reader: ReaderSection,
    pub sensor: SensorSection,
    pub scan: ScanSection,

    /// EPC (hex) to color name overrides.
    pub colors: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReaderSection {
    pub port: String,

    /// Access password as 8 hex digits.
    pub password: String,

    pub max_attempts: u32,
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
    pub inventory_area: InventoryArea,
}

impl Default for ReaderSection {
    fn default() -> Self {
        Self {
            port: DEFAULT_READER_PORT.into(),
            password: DEFAULT_ACCESS_PASSWORD.into(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
            inventory_area: InventoryArea::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SensorSection {
    pub port: String,
    pub baud_rate: u32,
    pub threshold_lux: f64,
}

impl Default for SensorSection {
    fn default() -> Self {
        Self {
            port: DEFAULT_SENSOR_PORT.into(),
            baud_rate: DEFAULT_SENSOR_BAUD_RATE,
            threshold_lux: DEFAULT_ILLUMINATION_THRESHOLD_LUX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanSection {
    pub window_ms: u64,
    pub idle_ms: u64,
    pub poll_interval_ms: u64,

    /// Detection target of single scans (`inventory`, `verify`).
    pub target_count: u32,
    pub max_scan_ms: u64,
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            window_ms: DEFAULT_WINDOW_MS,
            idle_ms: DEFAULT_IDLE_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            target_count: DEFAULT_TARGET_COUNT,
            max_scan_ms: DEFAULT_MAX_SCAN_MS,
        }
    }
}

impl Config {
    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every value that the typed accessors would otherwise reject.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reader.port.trim().is_empty() {
            return Err(ConfigError::validation("reader.port", "must not be empty"));
        }
        if self.sensor.port.trim().is_empty() {
            return Err(ConfigError::validation("sensor.port", "must not be empty"));
        }
        if self.reader.max_attempts == 0 {
            return Err(ConfigError::validation(
                "reader.max_attempts",
                "must be at least 1",
            ));
        }
        if self.reader.inventory_area.word_length == 0 {
            return Err(ConfigError::validation(
                "reader.inventory_area.word_length",
                "must be greater than zero",
            ));
        }
        if self.sensor.baud_rate == 0 {
            return Err(ConfigError::validation("sensor.baud_rate", "must be positive"));
        }
        if !self.sensor.threshold_lux.is_finite() || self.sensor.threshold_lux < 0.0 {
            return Err(ConfigError::validation(
                "sensor.threshold_lux",
                "must be a non-negative number",
            ));
        }
        for (field, value) in [
            ("scan.window_ms", self.scan.window_ms),
            ("scan.poll_interval_ms", self.scan.poll_interval_ms),
            ("scan.max_scan_ms", self.scan.max_scan_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::validation(field, "must be greater than zero"));
            }
        }
        self.password()?;
        self.color_rule()?;
        Ok(())
    }

    pub fn password(&self) -> Result<AccessPassword, ConfigError> {
        AccessPassword::from_hex(&self.reader.password)
            .map_err(|e| ConfigError::validation("reader.password", e.to_string()))
    }

    pub fn access_policy(&self) -> AccessPolicy {
        AccessPolicy::new(
            self.reader.max_attempts,
            Duration::from_millis(self.reader.read_timeout_ms),
            Duration::from_millis(self.reader.write_timeout_ms),
        )
    }

    pub fn sensor_serial(&self) -> SerialConfig {
        SerialConfig::new(&self.sensor.port, self.sensor.baud_rate)
    }

    pub fn cadence(&self) -> ContinuousCadence {
        ContinuousCadence {
            window: Duration::from_millis(self.scan.window_ms),
            idle: Duration::from_millis(self.scan.idle_ms),
            poll_interval: Duration::from_millis(self.scan.poll_interval_ms),
        }
    }

    pub fn scan_limits(&self) -> ScanLimits {
        ScanLimits::new(
            self.scan.target_count,
            Duration::from_millis(self.scan.max_scan_ms),
        )
        .with_poll_interval(Duration::from_millis(self.scan.poll_interval_ms))
    }

    pub fn color_rule(&self) -> Result<TagColorRule, ConfigError> {
        let mut rule = TagColorRule::new();
        for (epc, color) in &self.colors {
            rule.add_tag_color(epc, color)
                .map_err(|e| ConfigError::validation(&format!("colors.{epc}"), e.to_string()))?;
        }
        Ok(rule)
    }

    pub fn actuation_policy(&self) -> Result<ActuationPolicy, ConfigError> {
        Ok(ActuationPolicy::new(
            self.sensor.threshold_lux,
            self.color_rule()?,
        ))
    }
}
