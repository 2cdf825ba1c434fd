//! BLE adapter error types.

use lumibulb_domain::error::BulbError;

/// Errors specific to the BLE adapter.
#[derive(Debug, thiserror::Error)]
pub enum BleError {
    /// No BLE adapter found on the host.
    #[error("no BLE adapter available")]
    NotAvailable,

    /// The configured address is not a `AA:BB:CC:DD:EE:FF` MAC.
    #[error("invalid BLE address {address:?}")]
    InvalidAddress { address: String },

    /// The scan ended without seeing the bulb.
    #[error("peripheral {address} not found")]
    PeripheralNotFound { address: String },

    /// The bulb does not expose the color characteristic.
    #[error("characteristic {characteristic} of service {service} not found")]
    CharacteristicNotFound {
        service: uuid::Uuid,
        characteristic: uuid::Uuid,
    },

    /// A write was attempted with no open link.
    #[error("no open link to the bulb")]
    NotLinked,

    /// A scan or connect step exceeded its configured timeout.
    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    /// btleplug reported a failure.
    #[error("BLE error")]
    Btle(#[from] btleplug::Error),
}

impl BleError {
    /// Convert into a [`BulbError`] for propagation across port boundaries.
    #[must_use]
    pub fn into_domain(self) -> BulbError {
        match self {
            Self::NotLinked => BulbError::NotConnected,
            other => BulbError::Transport(Box::new(other)),
        }
    }
}

impl From<BleError> for BulbError {
    fn from(err: BleError) -> Self {
        err.into_domain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_not_available_error() {
        let err = BleError::NotAvailable;
        assert_eq!(err.to_string(), "no BLE adapter available");
    }

    #[test]
    fn should_display_timeout_error() {
        let err = BleError::Timeout { operation: "scan" };
        assert_eq!(err.to_string(), "scan timed out");
    }

    #[test]
    fn should_display_peripheral_not_found_error() {
        let err = BleError::PeripheralNotFound {
            address: "FC:58:FA:C1:76:47".to_owned(),
        };
        assert_eq!(err.to_string(), "peripheral FC:58:FA:C1:76:47 not found");
    }

    #[test]
    fn should_convert_missing_link_to_not_connected() {
        let err: BulbError = BleError::NotLinked.into();
        assert!(matches!(err, BulbError::NotConnected));
    }

    #[test]
    fn should_convert_btleplug_error_to_transport_error() {
        let err: BulbError = BleError::Btle(btleplug::Error::DeviceNotFound).into();
        assert!(matches!(err, BulbError::Transport(_)));
    }

    #[test]
    fn should_keep_ble_error_as_source() {
        let err: BulbError = BleError::NotAvailable.into();
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "no BLE adapter available");
    }
}
