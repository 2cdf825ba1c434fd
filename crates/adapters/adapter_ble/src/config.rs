//! BLE transport configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the btleplug transport.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BleConfig {
    /// How long to scan for the bulb before giving up, in seconds.
    pub scan_timeout_secs: u16,
    /// How long the GATT connection and service discovery may take, in
    /// seconds.
    pub connect_timeout_secs: u16,
}

impl BleConfig {
    #[must_use]
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.scan_timeout_secs))
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.connect_timeout_secs))
    }
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            scan_timeout_secs: 10,
            connect_timeout_secs: 15,
        }
    }
}
