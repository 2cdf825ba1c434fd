//! Virtual bulb — accepts frames like the real one and remembers them.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::broadcast;

use lumibulb_app::ports::{BulbTransport, LinkEvent};
use lumibulb_domain::color::Color;
use lumibulb_domain::connection::{DEFAULT_ADDRESS, DeviceIdentity};
use lumibulb_domain::error::BulbError;
use lumibulb_domain::frame::BulbFrame;

use super::lock;
use crate::error::VirtualError;

#[derive(Debug, Default)]
struct Radio {
    linked: bool,
    frames: Vec<BulbFrame>,
    color: Option<Color>,
}

/// A simulated bulb answering at one address.
pub struct VirtualBulb {
    address: String,
    radio: Mutex<Radio>,
    connect_delay: Mutex<Duration>,
    fail_connect: AtomicBool,
    fail_disconnect: AtomicBool,
    fail_write: AtomicBool,
    links: broadcast::Sender<LinkEvent>,
}

impl Default for VirtualBulb {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS)
    }
}

impl VirtualBulb {
    /// A powered bulb answering at `address`.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        let (links, _) = broadcast::channel(8);
        Self {
            address: address.into(),
            radio: Mutex::new(Radio::default()),
            connect_delay: Mutex::new(Duration::ZERO),
            fail_connect: AtomicBool::new(false),
            fail_disconnect: AtomicBool::new(false),
            fail_write: AtomicBool::new(false),
            links,
        }
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Color the bulb is showing, decoded from the last accepted frame.
    #[must_use]
    pub fn color(&self) -> Option<Color> {
        lock(&self.radio).color
    }

    /// Every frame accepted so far, oldest first.
    #[must_use]
    pub fn frames(&self) -> Vec<BulbFrame> {
        lock(&self.radio).frames.clone()
    }

    /// Colors of every accepted frame, oldest first.
    #[must_use]
    pub fn written_colors(&self) -> Vec<Color> {
        lock(&self.radio).frames.iter().map(BulbFrame::color).collect()
    }

    #[must_use]
    pub fn is_linked(&self) -> bool {
        lock(&self.radio).linked
    }

    /// Make the next connects take `delay`.
    pub fn set_connect_delay(&self, delay: Duration) {
        *lock(&self.connect_delay) = delay;
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_disconnect(&self, fail: bool) {
        self.fail_disconnect.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_write(&self, fail: bool) {
        self.fail_write.store(fail, Ordering::SeqCst);
    }

    /// Cut the power: the link drops and a [`LinkEvent::Lost`] is raised.
    ///
    /// Returns `false` when there was no link to drop.
    pub fn power_off(&self) -> bool {
        let was_linked = std::mem::replace(&mut lock(&self.radio).linked, false);
        if was_linked {
            tracing::info!(address = %self.address, "virtual bulb powered off");
            // No subscriber means nobody is watching the link.
            let _ = self.links.send(LinkEvent::Lost {
                address: self.address.clone(),
            });
        }
        was_linked
    }

    fn answers(&self, address: &str) -> Result<(), VirtualError> {
        if self.address.eq_ignore_ascii_case(address) && !self.fail_connect.load(Ordering::SeqCst)
        {
            Ok(())
        } else {
            Err(VirtualError::Unreachable {
                address: address.to_owned(),
            })
        }
    }

    fn accept(&self, frame: &BulbFrame) -> Result<(), VirtualError> {
        let mut radio = lock(&self.radio);
        if !radio.linked {
            return Err(VirtualError::NotLinked);
        }
        if self.fail_write.load(Ordering::SeqCst) {
            return Err(VirtualError::WriteRejected);
        }
        let color = BulbFrame::decode(frame.as_bytes()).ok_or_else(|| {
            VirtualError::MalformedFrame {
                bytes: frame.as_bytes().to_vec(),
            }
        })?;
        radio.frames.push(*frame);
        radio.color = Some(color);
        Ok(())
    }
}

impl BulbTransport for VirtualBulb {
    async fn is_adapter_enabled(&self) -> bool {
        true
    }

    async fn connect(&self, address: &str) -> Result<(), BulbError> {
        let delay = *lock(&self.connect_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.answers(address)?;
        lock(&self.radio).linked = true;
        tracing::debug!(%address, "virtual bulb linked");
        Ok(())
    }

    async fn disconnect(&self, address: &str) -> Result<(), BulbError> {
        lock(&self.radio).linked = false;
        if self.fail_disconnect.load(Ordering::SeqCst) {
            return Err(VirtualError::NoAnswer.into());
        }
        tracing::debug!(%address, "virtual bulb unlinked");
        Ok(())
    }

    async fn write_without_response(
        &self,
        _identity: &DeviceIdentity,
        frame: &BulbFrame,
    ) -> Result<(), BulbError> {
        self.accept(frame)?;
        Ok(())
    }

    fn link_events(&self) -> broadcast::Receiver<LinkEvent> {
        self.links.subscribe()
    }
}
