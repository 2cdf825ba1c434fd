//! Connection state and the fixed identity of the controlled bulb.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default bulb MAC address.
pub const DEFAULT_ADDRESS: &str = "FC:58:FA:C1:76:47";

/// 16-bit id of the GATT service carrying the color characteristic.
pub const COLOR_SERVICE_SHORT: u16 = 0xcc02;

/// 16-bit id of the color characteristic.
pub const COLOR_CHARACTERISTIC_SHORT: u16 = 0xee03;

/// The Bluetooth base UUID, `0000xxxx-0000-1000-8000-00805f9b34fb`.
const BLUETOOTH_BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_0080_5f9b_34fb;

/// Expand a 16-bit assigned id onto the Bluetooth base UUID.
#[must_use]
#[allow(clippy::cast_lossless)]
pub const fn uuid_from_short(short: u16) -> uuid::Uuid {
    uuid::Uuid::from_u128(BLUETOOTH_BASE_UUID | ((short as u128) << 96))
}

/// Parse either a 4-digit short id (`cc02`) or a full UUID string.
#[must_use]
pub fn parse_uuid(input: &str) -> Option<uuid::Uuid> {
    if input.len() == 4 && input.bytes().all(|b| b.is_ascii_hexdigit()) {
        return u16::from_str_radix(input, 16).ok().map(uuid_from_short);
    }
    uuid::Uuid::parse_str(input).ok()
}

/// Whether `address` looks like `AA:BB:CC:DD:EE:FF`.
#[must_use]
pub fn is_valid_address(address: &str) -> bool {
    let octets: Vec<&str> = address.split(':').collect();
    octets.len() == 6
        && octets
            .iter()
            .all(|o| o.len() == 2 && o.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Lifecycle of the single logical connection to the bulb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl ConnectionState {
    /// Only [`Connected`](Self::Connected) accepts writes.
    #[must_use]
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
            Self::Disconnecting => f.write_str("disconnecting"),
        }
    }
}

/// Address plus GATT ids of the one bulb this process controls.
///
/// Fixed at start-up; there is no multi-device support.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub address: String,
    pub service: uuid::Uuid,
    pub characteristic: uuid::Uuid,
}

impl DeviceIdentity {
    #[must_use]
    pub fn new(address: impl Into<String>, service: uuid::Uuid, characteristic: uuid::Uuid) -> Self {
        Self {
            address: address.into(),
            service,
            characteristic,
        }
    }
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self::new(
            DEFAULT_ADDRESS,
            uuid_from_short(COLOR_SERVICE_SHORT),
            uuid_from_short(COLOR_CHARACTERISTIC_SHORT),
        )
    }
}
