//! GATT helpers for the color characteristic.

use btleplug::api::{Characteristic, Peripheral as _, WriteType};
use btleplug::platform::Peripheral;

use lumibulb_domain::connection::DeviceIdentity;
use lumibulb_domain::frame::BulbFrame;

use crate::error::BleError;

/// Pick the characteristic `identity` names out of a discovered set.
///
/// # Errors
///
/// Returns [`BleError::CharacteristicNotFound`] when it is absent.
pub(crate) fn find_characteristic(
    characteristics: impl IntoIterator<Item = Characteristic>,
    identity: &DeviceIdentity,
) -> Result<Characteristic, BleError> {
    characteristics
        .into_iter()
        .find(|c| c.uuid == identity.characteristic && c.service_uuid == identity.service)
        .ok_or(BleError::CharacteristicNotFound {
            service: identity.service,
            characteristic: identity.characteristic,
        })
}

/// Connect and discover services.
///
/// The connection is closed again if discovery fails. The caller applies
/// the timeout.
///
/// # Errors
///
/// Returns [`BleError::Btle`] for any GATT failure.
pub(crate) async fn open(peripheral: &Peripheral) -> Result<(), BleError> {
    if !peripheral.is_connected().await? {
        peripheral.connect().await?;
    }

    if let Err(err) = peripheral.discover_services().await {
        if let Err(err) = peripheral.disconnect().await {
            tracing::warn!(%err, "failed to disconnect after service discovery error");
        }
        return Err(err.into());
    }
    Ok(())
}

/// Hand one color frame to the radio.
///
/// # Errors
///
/// Returns [`BleError::CharacteristicNotFound`] when the bulb does not
/// expose the color characteristic, or [`BleError::Btle`] when the write
/// is rejected.
pub(crate) async fn write_frame(
    peripheral: &Peripheral,
    identity: &DeviceIdentity,
    frame: &BulbFrame,
) -> Result<(), BleError> {
    let characteristic = find_characteristic(peripheral.characteristics(), identity)?;
    peripheral
        .write(&characteristic, frame.as_bytes(), WriteType::WithoutResponse)
        .await?;
    Ok(())
}
