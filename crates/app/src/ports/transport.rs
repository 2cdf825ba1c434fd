//! Transport port — the logical BLE operations the core needs.
//!
//! Adapters wrap a concrete BLE stack (or a simulation). The core never
//! waits for a write acknowledgement: `write_without_response` resolves as
//! soon as the frame has been handed to the radio.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;

use lumibulb_domain::connection::DeviceIdentity;
use lumibulb_domain::error::BulbError;
use lumibulb_domain::frame::BulbFrame;

/// Link-level notifications a transport raises on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The peripheral at `address` dropped the connection.
    Lost { address: String },
}

/// BLE operations against a single peripheral.
pub trait BulbTransport: Send + Sync {
    /// Whether a BLE adapter is present and usable.
    fn is_adapter_enabled(&self) -> impl Future<Output = bool> + Send;

    /// Connect to the peripheral at `address`.
    fn connect(&self, address: &str) -> impl Future<Output = Result<(), BulbError>> + Send;

    /// Disconnect from the peripheral at `address`.
    fn disconnect(&self, address: &str) -> impl Future<Output = Result<(), BulbError>> + Send;

    /// Hand one frame to the radio without waiting for an acknowledgement.
    fn write_without_response(
        &self,
        identity: &DeviceIdentity,
        frame: &BulbFrame,
    ) -> impl Future<Output = Result<(), BulbError>> + Send;

    /// Subscribe to unsolicited link events (e.g. the bulb powering off).
    fn link_events(&self) -> broadcast::Receiver<LinkEvent>;
}

impl<T: BulbTransport> BulbTransport for Arc<T> {
    fn is_adapter_enabled(&self) -> impl Future<Output = bool> + Send {
        (**self).is_adapter_enabled()
    }

    fn connect(&self, address: &str) -> impl Future<Output = Result<(), BulbError>> + Send {
        (**self).connect(address)
    }

    fn disconnect(&self, address: &str) -> impl Future<Output = Result<(), BulbError>> + Send {
        (**self).disconnect(address)
    }

    fn write_without_response(
        &self,
        identity: &DeviceIdentity,
        frame: &BulbFrame,
    ) -> impl Future<Output = Result<(), BulbError>> + Send {
        (**self).write_without_response(identity, frame)
    }

    fn link_events(&self) -> broadcast::Receiver<LinkEvent> {
        (**self).link_events()
    }
}
