//! In-process event bus backed by a tokio broadcast channel.

use tokio::sync::broadcast;

use lumibulb_domain::event::{BulbEvent, EventKind};

/// In-process event bus using a tokio [`broadcast`] channel.
///
/// Publishing succeeds even when there are no active subscribers
/// (the event is simply dropped). Clones share the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BulbEvent>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events on this bus.
    ///
    /// Returns a receiver that will get all events published *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BulbEvent> {
        self.sender.subscribe()
    }

    /// Timestamp `kind` and send it to every current subscriber.
    pub fn publish(&self, kind: EventKind) {
        // Only fails when nobody is subscribed.
        let _ = self.sender.send(BulbEvent::now(kind));
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
