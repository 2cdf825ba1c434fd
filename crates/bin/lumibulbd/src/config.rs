//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `lumibulb.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use lumibulb_adapter_ble::BleConfig;
use lumibulb_app::controller::ControlConfig;
use lumibulb_app::ports::ListenOptions;
use lumibulb_domain::connection::{self, DeviceIdentity};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which bulb to drive.
    pub device: DeviceConfig,
    /// Controller tunables.
    pub control: ControlSettings,
    /// BLE stack selection and timeouts.
    pub transport: TransportConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Address and GATT ids of the bulb.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// MAC address, `AA:BB:CC:DD:EE:FF`.
    pub address: String,
    /// Service id, short (`cc02`) or full UUID.
    pub service: String,
    /// Characteristic id, short (`ee03`) or full UUID.
    pub characteristic: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    /// Minimum spacing between motion-driven writes, in milliseconds.
    pub throttle_interval_ms: u64,
    /// Speech recognition locale.
    pub locale: String,
    pub partial_results: bool,
    /// Apply a finished transcription without waiting for the recording
    /// to be stopped.
    pub resolve_on_final: bool,
}

/// Which [`BulbTransport`](lumibulb_app::ports::BulbTransport) to wire in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// The host's BLE adapter via btleplug.
    #[default]
    Ble,
    /// An in-memory bulb.
    Virtual,
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "ble" => Ok(Self::Ble),
            "virtual" => Ok(Self::Virtual),
            other => Err(ConfigError::Validation(format!(
                "unknown transport {other:?}, expected \"ble\" or \"virtual\""
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub kind: TransportKind,
    /// Timeouts of the BLE transport, ignored by the virtual one.
    #[serde(flatten)]
    pub ble: BleConfig,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `lumibulb.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration does not validate.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("lumibulb.toml")?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = lookup("LUMIBULB_ADDRESS") {
            self.device.address = val;
        }
        if let Some(val) = lookup("LUMIBULB_TRANSPORT") {
            self.transport.kind = val.parse()?;
        }
        if let Some(val) = lookup("LUMIBULB_THROTTLE_MS") {
            self.control.throttle_interval_ms = val.parse().map_err(|_| {
                ConfigError::Validation(format!("LUMIBULB_THROTTLE_MS is not a number: {val:?}"))
            })?;
        }
        if let Some(val) = lookup("LUMIBULB_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = lookup("RUST_LOG") {
            self.logging.filter = val;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.control.throttle_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "throttle_interval_ms must be non-zero".to_string(),
            ));
        }
        self.device_identity()?;
        Ok(())
    }

    /// The bulb to drive, with its GATT ids expanded.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for a malformed address or id.
    pub fn device_identity(&self) -> Result<DeviceIdentity, ConfigError> {
        if !connection::is_valid_address(&self.device.address) {
            return Err(ConfigError::Validation(format!(
                "device address {:?} is not AA:BB:CC:DD:EE:FF",
                self.device.address
            )));
        }
        let service = parse_gatt_id("service", &self.device.service)?;
        let characteristic = parse_gatt_id("characteristic", &self.device.characteristic)?;
        Ok(DeviceIdentity::new(
            self.device.address.clone(),
            service,
            characteristic,
        ))
    }

    #[must_use]
    pub fn control_config(&self) -> ControlConfig {
        ControlConfig {
            throttle_interval: Duration::from_millis(self.control.throttle_interval_ms),
            listen: ListenOptions {
                locale: self.control.locale.clone(),
                partial_results: self.control.partial_results,
            },
            resolve_on_final: self.control.resolve_on_final,
        }
    }
}

fn parse_gatt_id(field: &str, value: &str) -> Result<uuid::Uuid, ConfigError> {
    connection::parse_uuid(value).ok_or_else(|| {
        ConfigError::Validation(format!("device {field} {value:?} is not a UUID or 16-bit id"))
    })
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: connection::DEFAULT_ADDRESS.to_string(),
            service: format!("{:04x}", connection::COLOR_SERVICE_SHORT),
            characteristic: format!("{:04x}", connection::COLOR_CHARACTERISTIC_SHORT),
        }
    }
}

impl Default for ControlSettings {
    fn default() -> Self {
        let listen = ListenOptions::default();
        Self {
            throttle_interval_ms: 500,
            locale: listen.locale,
            partial_results: listen.partial_results,
            resolve_on_final: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "lumibulb=info,btleplug=warn".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
