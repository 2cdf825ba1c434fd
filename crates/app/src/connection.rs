//! Connection state machine — owns the single logical link to the bulb.
//!
//! ```text
//!  Disconnected ──connect()──▶ Connecting ──ok──▶ Connected
//!       ▲                          │                 │
//!       └────────────failed────────┘          disconnect()
//!       ▲                                            ▼
//!       └──────────────(ok or error)────────── Disconnecting
//! ```
//!
//! Transitions are compare-and-set on a [`watch`] channel, so two concurrent
//! `connect()` calls can never both leave `Disconnected`.

use tokio::sync::{Mutex, watch};

use lumibulb_domain::connection::{ConnectionState, DeviceIdentity};
use lumibulb_domain::error::BulbError;
use lumibulb_domain::event::EventKind;
use lumibulb_domain::frame::BulbFrame;

use crate::event_bus::EventBus;
use crate::ports::BulbTransport;

/// The one connection this process maintains.
pub struct Connection<T> {
    transport: T,
    identity: DeviceIdentity,
    state: watch::Sender<ConnectionState>,
    events: EventBus,
    write_lock: Mutex<()>,
}

impl<T: BulbTransport> Connection<T> {
    /// Create a disconnected state machine bound to `identity`.
    pub fn new(transport: T, identity: DeviceIdentity, events: EventBus) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            transport,
            identity,
            state,
            events,
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch every state transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Move `from → to` atomically. Returns `false` if the current state is
    /// not `from`.
    fn transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        self.state.send_if_modified(|current| {
            if *current == from {
                *current = to;
                true
            } else {
                false
            }
        })
    }

    /// Connect to the bulb.
    ///
    /// # Errors
    ///
    /// - [`BulbError::AlreadyConnectingOrConnected`] unless currently
    ///   `Disconnected`; the state is left untouched.
    /// - [`BulbError::ConnectionFailed`] when the transport fails; the state
    ///   returns to `Disconnected`.
    pub async fn connect(&self) -> Result<(), BulbError> {
        if !self.transition(ConnectionState::Disconnected, ConnectionState::Connecting) {
            tracing::debug!(state = %self.state(), "connect ignored");
            return Err(BulbError::AlreadyConnectingOrConnected);
        }

        let address = self.identity.address.as_str();
        tracing::info!(%address, "connecting to bulb");

        // Reset to Disconnected if this future is dropped mid-connect.
        let mut guard = ResetGuard {
            state: &self.state,
            armed: true,
        };

        let result = self.transport.connect(address).await;
        guard.armed = false;

        match result {
            Ok(()) => {
                self.state.send_replace(ConnectionState::Connected);
                tracing::info!(%address, "bulb connected");
                self.events.publish(EventKind::Connected {
                    address: address.to_owned(),
                });
                Ok(())
            }
            Err(err) => {
                self.state.send_replace(ConnectionState::Disconnected);
                tracing::warn!(%err, %address, "bulb connection failed");
                self.events.publish(EventKind::ConnectionFailed {
                    address: address.to_owned(),
                    reason: err.to_string(),
                });
                Err(match err {
                    BulbError::ConnectionFailed(_) => err,
                    other => BulbError::ConnectionFailed(Box::new(other)),
                })
            }
        }
    }

    /// Disconnect from the bulb.
    ///
    /// The state always ends up `Disconnected`: an unreachable peripheral is
    /// treated as implicitly gone.
    ///
    /// # Errors
    ///
    /// - [`BulbError::NotConnected`] unless currently `Connected`.
    /// - [`BulbError::Disconnect`] carrying the transport failure, for
    ///   logging only.
    pub async fn disconnect(&self) -> Result<(), BulbError> {
        if !self.transition(ConnectionState::Connected, ConnectionState::Disconnecting) {
            return Err(BulbError::NotConnected);
        }

        let address = self.identity.address.as_str();
        let mut guard = ResetGuard {
            state: &self.state,
            armed: true,
        };
        let result = self.transport.disconnect(address).await;
        guard.armed = false;

        self.state.send_replace(ConnectionState::Disconnected);
        self.events.publish(EventKind::Disconnected {
            address: address.to_owned(),
        });

        match result {
            Ok(()) => {
                tracing::info!(%address, "bulb disconnected");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%err, %address, "disconnect error, treating bulb as disconnected");
                Err(match err {
                    BulbError::Disconnect(_) => err,
                    other => BulbError::Disconnect(Box::new(other)),
                })
            }
        }
    }

    /// Write one frame, fire-and-forget.
    ///
    /// Writes are serialized; when two race, whichever reaches the radio
    /// last wins.
    ///
    /// # Errors
    ///
    /// Returns [`BulbError::NotConnected`] outside `Connected` (the state is
    /// left untouched), or whatever the transport reports.
    pub async fn write(&self, frame: &BulbFrame) -> Result<(), BulbError> {
        if !self.state().is_connected() {
            return Err(BulbError::NotConnected);
        }
        let _serialized = self.write_lock.lock().await;
        // The link may have gone while waiting for the previous write.
        if !self.state().is_connected() {
            return Err(BulbError::NotConnected);
        }
        self.transport
            .write_without_response(&self.identity, frame)
            .await
    }

    /// Record that the peripheral dropped the link on its own.
    ///
    /// Returns `true` if this moved the machine out of `Connected`. No
    /// reconnection is attempted.
    pub fn mark_link_lost(&self) -> bool {
        if !self.transition(ConnectionState::Connected, ConnectionState::Disconnected) {
            return false;
        }
        let address = self.identity.address.clone();
        tracing::warn!(%address, "bulb link lost");
        self.events.publish(EventKind::LinkLost {
            address: address.clone(),
        });
        self.events.publish(EventKind::Disconnected { address });
        true
    }
}

/// Forces `Disconnected` when an in-flight connect or disconnect is dropped.
struct ResetGuard<'a> {
    state: &'a watch::Sender<ConnectionState>,
    armed: bool,
}

impl Drop for ResetGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.send_replace(ConnectionState::Disconnected);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::future::Future;
    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;

    use tokio::sync::{Notify, broadcast};

    use lumibulb_domain::color::Color;

    use crate::ports::LinkEvent;

    #[derive(Default)]
    struct FakeTransport {
        fail_connect: bool,
        fail_disconnect: bool,
        gate: Option<Arc<Notify>>,
        disconnect_gate: Option<Arc<Notify>>,
        write_gate: Option<Arc<Notify>>,
        connects: StdMutex<u32>,
        frames: StdMutex<Vec<BulbFrame>>,
    }

    impl BulbTransport for FakeTransport {
        fn is_adapter_enabled(&self) -> impl Future<Output = bool> + Send {
            async { true }
        }

        fn connect(&self, _address: &str) -> impl Future<Output = Result<(), BulbError>> + Send {
            *self.connects.lock().unwrap() += 1;
            let gate = self.gate.clone();
            let fail = self.fail_connect;
            async move {
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                if fail {
                    Err(BulbError::Transport("peripheral not found".into()))
                } else {
                    Ok(())
                }
            }
        }

        fn disconnect(&self, _address: &str) -> impl Future<Output = Result<(), BulbError>> + Send {
            let fail = self.fail_disconnect;
            let gate = self.disconnect_gate.clone();
            async move {
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                if fail {
                    Err(BulbError::Transport("peripheral unreachable".into()))
                } else {
                    Ok(())
                }
            }
        }

        fn write_without_response(
            &self,
            _identity: &DeviceIdentity,
            frame: &BulbFrame,
        ) -> impl Future<Output = Result<(), BulbError>> + Send {
            self.frames.lock().unwrap().push(*frame);
            let gate = self.write_gate.clone();
            async move {
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                Ok(())
            }
        }

        fn link_events(&self) -> broadcast::Receiver<LinkEvent> {
            broadcast::channel(1).1
        }
    }

    fn connection(transport: FakeTransport) -> Connection<FakeTransport> {
        Connection::new(transport, DeviceIdentity::default(), EventBus::new(16))
    }

    #[tokio::test]
    async fn should_start_disconnected() {
        let conn = connection(FakeTransport::default());
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn should_reject_write_while_disconnected_without_changing_state() {
        let conn = connection(FakeTransport::default());
        let frame = BulbFrame::encode(Color::new(255, 0, 0));

        let result = conn.write(&frame).await;

        assert!(matches!(result, Err(BulbError::NotConnected)));
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(conn.transport().frames.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_pass_through_connecting_before_connected() {
        let gate = Arc::new(Notify::new());
        let conn = Arc::new(connection(FakeTransport {
            gate: Some(Arc::clone(&gate)),
            ..FakeTransport::default()
        }));
        let mut states = conn.subscribe();

        let task = tokio::spawn({
            let conn = Arc::clone(&conn);
            async move { conn.connect().await }
        });

        states.changed().await.unwrap();
        assert_eq!(*states.borrow_and_update(), ConnectionState::Connecting);

        gate.notify_one();
        task.await.unwrap().unwrap();
        assert_eq!(conn.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn should_publish_connected_event() {
        let conn = connection(FakeTransport::default());
        let mut events = conn.events.subscribe();

        conn.connect().await.unwrap();

        let event = events.recv().await.unwrap();
        assert!(matches!(event.kind, EventKind::Connected { address } if address == "FC:58:FA:C1:76:47"));
    }

    #[tokio::test]
    async fn should_reject_connect_while_connecting() {
        let gate = Arc::new(Notify::new());
        let conn = Arc::new(connection(FakeTransport {
            gate: Some(Arc::clone(&gate)),
            ..FakeTransport::default()
        }));
        let mut states = conn.subscribe();

        let first = tokio::spawn({
            let conn = Arc::clone(&conn);
            async move { conn.connect().await }
        });
        states.changed().await.unwrap();

        let second = conn.connect().await;
        assert!(matches!(second, Err(BulbError::AlreadyConnectingOrConnected)));
        assert_eq!(conn.state(), ConnectionState::Connecting);

        gate.notify_one();
        first.await.unwrap().unwrap();
        assert_eq!(*conn.transport().connects.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn should_reject_connect_while_connected() {
        let conn = connection(FakeTransport::default());
        conn.connect().await.unwrap();

        let result = conn.connect().await;

        assert!(matches!(result, Err(BulbError::AlreadyConnectingOrConnected)));
        assert_eq!(conn.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn should_return_to_disconnected_when_connect_fails() {
        let conn = connection(FakeTransport {
            fail_connect: true,
            ..FakeTransport::default()
        });

        let result = conn.connect().await;

        assert!(matches!(result, Err(BulbError::ConnectionFailed(_))));
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn should_reset_state_when_connect_is_cancelled() {
        let gate = Arc::new(Notify::new());
        let conn = connection(FakeTransport {
            gate: Some(gate),
            ..FakeTransport::default()
        });

        let timed_out =
            tokio::time::timeout(std::time::Duration::from_millis(10), conn.connect()).await;

        assert!(timed_out.is_err());
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn should_write_frames_when_connected() {
        let conn = connection(FakeTransport::default());
        conn.connect().await.unwrap();
        let frame = BulbFrame::encode(Color::new(3, 12, 255));

        conn.write(&frame).await.unwrap();

        assert_eq!(*conn.transport().frames.lock().unwrap(), vec![frame]);
    }

    #[tokio::test]
    async fn should_disconnect_from_connected() {
        let conn = connection(FakeTransport::default());
        conn.connect().await.unwrap();

        conn.disconnect().await.unwrap();

        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn should_end_disconnected_even_when_disconnect_fails() {
        let conn = connection(FakeTransport {
            fail_disconnect: true,
            ..FakeTransport::default()
        });
        conn.connect().await.unwrap();

        let result = conn.disconnect().await;

        assert!(matches!(result, Err(BulbError::Disconnect(_))));
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn should_reset_state_when_disconnect_is_cancelled() {
        let conn = connection(FakeTransport {
            disconnect_gate: Some(Arc::new(Notify::new())),
            ..FakeTransport::default()
        });
        conn.connect().await.unwrap();

        let timed_out =
            tokio::time::timeout(std::time::Duration::from_millis(10), conn.disconnect()).await;

        assert!(timed_out.is_err());
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        conn.connect().await.unwrap();
        assert_eq!(conn.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn should_drop_queued_write_when_link_closes_meanwhile() {
        let gate = Arc::new(Notify::new());
        let conn = Arc::new(connection(FakeTransport {
            write_gate: Some(Arc::clone(&gate)),
            ..FakeTransport::default()
        }));
        conn.connect().await.unwrap();
        let first = BulbFrame::encode(Color::new(255, 0, 0));
        let second = BulbFrame::encode(Color::new(0, 0, 255));

        let in_flight = tokio::spawn({
            let conn = Arc::clone(&conn);
            async move { conn.write(&first).await }
        });
        let queued = tokio::spawn({
            let conn = Arc::clone(&conn);
            async move { conn.write(&second).await }
        });
        while conn.transport().frames.lock().unwrap().is_empty() {
            tokio::task::yield_now().await;
        }
        tokio::task::yield_now().await;

        conn.disconnect().await.unwrap();
        gate.notify_one();

        in_flight.await.unwrap().unwrap();
        assert!(matches!(queued.await.unwrap(), Err(BulbError::NotConnected)));
        assert_eq!(*conn.transport().frames.lock().unwrap(), vec![first]);
    }

    #[tokio::test]
    async fn should_reject_disconnect_when_not_connected() {
        let conn = connection(FakeTransport::default());
        let result = conn.disconnect().await;
        assert!(matches!(result, Err(BulbError::NotConnected)));
    }

    #[tokio::test]
    async fn should_mark_link_lost_only_when_connected() {
        let conn = connection(FakeTransport::default());
        assert!(!conn.mark_link_lost());

        conn.connect().await.unwrap();
        assert!(conn.mark_link_lost());
        assert_eq!(conn.state(), ConnectionState::Disconnected);

        let frame = BulbFrame::encode(Color::BLACK);
        assert!(matches!(conn.write(&frame).await, Err(BulbError::NotConnected)));
    }

    #[tokio::test]
    async fn should_allow_reconnect_after_disconnect() {
        let conn = connection(FakeTransport::default());
        conn.connect().await.unwrap();
        conn.disconnect().await.unwrap();

        conn.connect().await.unwrap();

        assert_eq!(conn.state(), ConnectionState::Connected);
        assert_eq!(*conn.transport().connects.lock().unwrap(), 2);
    }
}
