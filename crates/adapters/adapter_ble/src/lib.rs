//! # lumibulb-adapter-ble
//!
//! BLE transport for the color bulb, built on `btleplug`.
//!
//! ## How it works
//!
//! `connect` takes the first host adapter, scans until the bulb's MAC shows
//! up, opens a GATT connection and discovers its services. Color frames are
//! written to the `ee03` characteristic of service `cc02` with
//! [`WriteType::WithoutResponse`](btleplug::api::WriteType): nothing waits
//! for the bulb to acknowledge. While linked, a background task watches the
//! adapter for the bulb disconnecting on its own and reports it as a
//! [`LinkEvent::Lost`].
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `lumibulb-app` and `lumibulb-domain`.

mod config;
mod error;
mod gatt;
mod scanner;

pub use config::BleConfig;
pub use error::BleError;

use btleplug::api::{Central as _, Peripheral as _};
use btleplug::platform::{Adapter, Peripheral};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;

use lumibulb_app::ports::{BulbTransport, LinkEvent};
use lumibulb_domain::connection::DeviceIdentity;
use lumibulb_domain::error::BulbError;
use lumibulb_domain::frame::BulbFrame;

/// An open GATT link.
struct Link {
    // Kept so the adapter outlives the peripheral handle.
    _central: Adapter,
    peripheral: Peripheral,
    watcher: JoinHandle<()>,
}

/// [`BulbTransport`] over the host's BLE adapter.
pub struct BleBulb {
    config: BleConfig,
    link: Mutex<Option<Link>>,
    links: broadcast::Sender<LinkEvent>,
}

impl BleBulb {
    #[must_use]
    pub fn new(config: BleConfig) -> Self {
        let (links, _) = broadcast::channel(8);
        Self {
            config,
            link: Mutex::new(None),
            links,
        }
    }

    async fn open_link(&self, address: &str) -> Result<Link, BleError> {
        let target = scanner::parse_address(address)?;
        let central = scanner::first_adapter().await?;
        let peripheral =
            scanner::find_peripheral(&central, target, self.config.scan_timeout()).await?;

        // Subscribe before connecting so an early drop is not missed.
        let events = central.events().await?;

        tokio::time::timeout(self.config.connect_timeout(), gatt::open(&peripheral))
            .await
            .map_err(|_| BleError::Timeout {
                operation: "connect",
            })??;

        let watcher = tokio::spawn(scanner::watch_disconnects(
            events,
            peripheral.id(),
            address.to_owned(),
            self.links.clone(),
        ));

        Ok(Link {
            _central: central,
            peripheral,
            watcher,
        })
    }
}

impl BulbTransport for BleBulb {
    async fn is_adapter_enabled(&self) -> bool {
        match scanner::first_adapter().await {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!(%err, "no usable BLE adapter");
                false
            }
        }
    }

    async fn connect(&self, address: &str) -> Result<(), BulbError> {
        let mut link = self.link.lock().await;
        if let Some(stale) = link.take() {
            stale.watcher.abort();
        }

        let opened = self.open_link(address).await?;
        tracing::debug!(%address, "GATT link open");
        *link = Some(opened);
        Ok(())
    }

    async fn disconnect(&self, address: &str) -> Result<(), BulbError> {
        let Some(link) = self.link.lock().await.take() else {
            tracing::debug!(%address, "no link to close");
            return Ok(());
        };
        link.watcher.abort();
        link.peripheral
            .disconnect()
            .await
            .map_err(|err| BleError::from(err).into_domain())
    }

    async fn write_without_response(
        &self,
        identity: &DeviceIdentity,
        frame: &BulbFrame,
    ) -> Result<(), BulbError> {
        let link = self.link.lock().await;
        let link = link.as_ref().ok_or(BleError::NotLinked)?;
        gatt::write_frame(&link.peripheral, identity, frame).await?;
        tracing::trace!(hex = %frame.color(), "frame written");
        Ok(())
    }

    fn link_events(&self) -> broadcast::Receiver<LinkEvent> {
        self.links.subscribe()
    }
}

impl Drop for BleBulb {
    fn drop(&mut self) {
        if let Some(link) = self.link.get_mut().take() {
            link.watcher.abort();
        }
    }
}
