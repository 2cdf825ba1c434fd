//! Adapter lookup and peripheral discovery.

use std::time::Duration;

use btleplug::api::{BDAddr, Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use tokio::sync::broadcast;
use tokio_stream::{Stream, StreamExt as _};

use lumibulb_app::ports::LinkEvent;

use crate::error::BleError;

/// Parse an `AA:BB:CC:DD:EE:FF` MAC address.
///
/// # Errors
///
/// Returns [`BleError::InvalidAddress`] for anything else.
pub(crate) fn parse_address(address: &str) -> Result<BDAddr, BleError> {
    address.parse().map_err(|_| BleError::InvalidAddress {
        address: address.to_owned(),
    })
}

/// First BLE adapter of the host.
///
/// # Errors
///
/// Returns [`BleError::NotAvailable`] when the host has none.
pub(crate) async fn first_adapter() -> Result<Adapter, BleError> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;
    adapters.into_iter().next().ok_or(BleError::NotAvailable)
}

/// Scan until the peripheral at `target` shows up, for at most `timeout`.
///
/// A peripheral the adapter already knows is returned without scanning.
///
/// # Errors
///
/// Returns [`BleError::PeripheralNotFound`] when the scan ends without a
/// match, or [`BleError::Btle`] when the adapter refuses to scan.
pub(crate) async fn find_peripheral(
    central: &Adapter,
    target: BDAddr,
    timeout: Duration,
) -> Result<Peripheral, BleError> {
    let mut events = central.events().await?;

    for peripheral in central.peripherals().await? {
        if peripheral.address() == target {
            tracing::debug!(address = %target, "bulb already known to the adapter");
            return Ok(peripheral);
        }
    }

    central.start_scan(ScanFilter::default()).await?;
    tracing::debug!(address = %target, timeout_secs = timeout.as_secs(), "scanning for bulb");

    let search = async {
        while let Some(event) = events.next().await {
            let (CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id)) = event
            else {
                continue;
            };
            let Ok(peripheral) = central.peripheral(&id).await else {
                continue;
            };
            if peripheral.address() == target {
                return Some(peripheral);
            }
            tracing::trace!(address = %peripheral.address(), "ignoring BLE device");
        }
        None
    };
    let found = tokio::time::timeout(timeout, search).await.ok().flatten();

    if let Err(err) = central.stop_scan().await {
        tracing::warn!(%err, "failed to stop BLE scan");
    }

    found.ok_or_else(|| BleError::PeripheralNotFound {
        address: target.to_string(),
    })
}

/// Forward the first disconnect of `target` seen on `events` as a
/// [`LinkEvent::Lost`].
pub(crate) async fn watch_disconnects<S>(
    mut events: S,
    target: PeripheralId,
    address: String,
    links: broadcast::Sender<LinkEvent>,
) where
    S: Stream<Item = CentralEvent> + Unpin,
{
    while let Some(event) = events.next().await {
        if let CentralEvent::DeviceDisconnected(id) = event {
            if id == target {
                tracing::warn!(%address, "bulb dropped the BLE link");
                // Nobody listening means nobody cares.
                let _ = links.send(LinkEvent::Lost { address });
                return;
            }
        }
    }
    tracing::debug!("central event stream closed");
}
