//! Bulb controller — routes color intents from the picker, the voice session
//! and the accelerometer to the bulb, and publishes what the UI shows.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt as _;
use tokio_stream::wrappers::WatchStream;

use lumibulb_domain::color::Color;
use lumibulb_domain::connection::{ConnectionState, DeviceIdentity};
use lumibulb_domain::error::BulbError;
use lumibulb_domain::event::{BulbEvent, ColorSource, Delivery, EventKind, Notice};
use lumibulb_domain::frame::BulbFrame;
use lumibulb_domain::named_color;
use lumibulb_domain::sensor::AxisSample;
use lumibulb_domain::speech::{SpeechSession, Transcription};

use crate::connection::Connection;
use crate::event_bus::EventBus;
use crate::ports::{BulbTransport, LinkEvent, ListenOptions, MotionSensor, SpeechRecognizer};
use crate::state::BulbControlState;
use crate::throttle::{self, SensorStreamHandle};

/// Tunables for [`BulbController`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlConfig {
    /// Minimum spacing between two motion-driven writes.
    pub throttle_interval: Duration,
    pub listen: ListenOptions,
    /// Apply a finished transcription immediately instead of waiting for
    /// the user to stop recording.
    pub resolve_on_final: bool,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            throttle_interval: throttle::DEFAULT_INTERVAL,
            listen: ListenOptions::default(),
            resolve_on_final: true,
        }
    }
}

/// Outcome of the start-up capability checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    pub speech_available: bool,
    pub microphone_granted: bool,
    pub adapter_enabled: bool,
}

/// What happened to a transcription handed to the session.
enum Recorded {
    /// No open session: recording already stopped.
    Ignored,
    Stored,
    /// A finished result to resolve right away.
    Final(String),
}

/// State reachable from background tasks.
struct Shared<T> {
    connection: Connection<T>,
    state: watch::Sender<BulbControlState>,
    events: EventBus,
    session: Mutex<Option<SpeechSession>>,
}

impl<T: BulbTransport> Shared<T> {
    fn lock_session(&self) -> MutexGuard<'_, Option<SpeechSession>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notice(&self, notice: Notice) {
        self.events.publish(EventKind::Notice(notice));
    }

    fn sync_connection(&self) {
        let connection = self.connection.state();
        self.state.send_if_modified(|state| {
            if state.connection == connection {
                false
            } else {
                state.connection = connection;
                true
            }
        });
    }

    fn clear_color(&self) {
        let cleared = self.state.send_if_modified(|state| {
            let shown = state.color.is_some();
            state.clear();
            shown
        });
        if cleared {
            self.events.publish(EventKind::ColorCleared);
        }
    }

    fn set_recording(&self, recording: bool) {
        self.state.send_modify(|state| state.recording = recording);
        self.events.publish(EventKind::RecordingChanged { recording });
    }

    fn set_streaming(&self, streaming: bool) {
        self.state.send_modify(|state| state.streaming = streaming);
        self.events.publish(EventKind::StreamingChanged { streaming });
    }

    /// Display `color` (unless it is the baseline) and write it to the bulb.
    async fn apply_color(&self, color: Color, source: ColorSource) -> Delivery {
        if source != ColorSource::Baseline {
            self.state.send_modify(|state| state.show(color));
        }

        let frame = BulbFrame::encode(color);
        let delivery = match self.connection.write(&frame).await {
            Ok(()) => Delivery::Sent,
            Err(BulbError::NotConnected) => {
                tracing::debug!(hex = %color, %source, "bulb not connected, write skipped");
                Delivery::Skipped
            }
            Err(err) => {
                tracing::warn!(%err, hex = %color, %source, "color write failed");
                Delivery::Failed
            }
        };

        self.events.publish(EventKind::ColorApplied {
            color,
            source,
            delivery,
        });
        delivery
    }

    /// Resolve a spoken phrase and apply it. An unknown name leaves the
    /// displayed color alone.
    async fn apply_phrase(&self, phrase: &str) -> Result<Delivery, BulbError> {
        match named_color::resolve(phrase) {
            Ok(color) => {
                tracing::info!(%phrase, hex = %color, "spoken color resolved");
                Ok(self.apply_color(color, ColorSource::Voice).await)
            }
            Err(err) => {
                tracing::warn!(%phrase, "spoken phrase is not an accepted color");
                self.notice(Notice::UnknownColor {
                    name: phrase.to_owned(),
                });
                Err(err)
            }
        }
    }

    fn record_transcription(&self, transcription: Transcription, resolve_on_final: bool) -> Recorded {
        let mut guard = self.lock_session();
        let Some(session) = guard.as_mut() else {
            return Recorded::Ignored;
        };

        let finished = transcription.finished;
        let text = transcription.text.clone();
        if !session.record(transcription) {
            return Recorded::Ignored;
        }
        self.events.publish(EventKind::Transcribed { text, finished });

        if finished && resolve_on_final {
            session.consume().map_or(Recorded::Stored, Recorded::Final)
        } else {
            Recorded::Stored
        }
    }

    /// Close the session and hand back the phrase still waiting to be
    /// resolved, if any.
    fn close_session(&self) -> Option<String> {
        let mut session = self.lock_session().take()?;
        session.stop();
        session.consume()
    }
}

async fn forward_transcriptions<T: BulbTransport>(
    shared: Arc<Shared<T>>,
    mut results: mpsc::UnboundedReceiver<Transcription>,
    resolve_on_final: bool,
) {
    while let Some(transcription) = results.recv().await {
        match shared.record_transcription(transcription, resolve_on_final) {
            Recorded::Ignored => break,
            Recorded::Stored => {}
            Recorded::Final(phrase) => {
                // Failures are already reported as notices.
                let _ = shared.apply_phrase(&phrase).await;
            }
        }
    }
    tracing::debug!("transcription forwarding ended");
}

#[derive(Default)]
struct Sessions {
    speech: Option<JoinHandle<()>>,
    motion: Option<SensorStreamHandle>,
}

/// The orchestrator: one bulb, one recognizer, one accelerometer.
///
/// Voice and motion sessions run independently of each other. Every color
/// goes through the same write path, so with both active the bulb shows
/// whichever write reached it last.
pub struct BulbController<T, S, M> {
    shared: Arc<Shared<T>>,
    speech: S,
    motion: M,
    config: ControlConfig,
    sessions: tokio::sync::Mutex<Sessions>,
    link_watch: Mutex<Option<JoinHandle<()>>>,
}

impl<T, S, M> BulbController<T, S, M>
where
    T: BulbTransport + 'static,
    S: SpeechRecognizer,
    M: MotionSensor,
{
    pub fn new(
        transport: T,
        speech: S,
        motion: M,
        identity: DeviceIdentity,
        config: ControlConfig,
    ) -> Self {
        Self::with_event_bus(transport, speech, motion, identity, config, EventBus::default())
    }

    /// Like [`new`](Self::new), publishing on an existing bus.
    pub fn with_event_bus(
        transport: T,
        speech: S,
        motion: M,
        identity: DeviceIdentity,
        config: ControlConfig,
        events: EventBus,
    ) -> Self {
        let (state, _) = watch::channel(BulbControlState::default());
        let shared = Arc::new(Shared {
            connection: Connection::new(transport, identity, events.clone()),
            state,
            events,
            session: Mutex::new(None),
        });
        Self {
            shared,
            speech,
            motion,
            config,
            sessions: tokio::sync::Mutex::new(Sessions::default()),
            link_watch: Mutex::new(None),
        }
    }

    // ── observation ─────────────────────────────────────────────────────

    /// Current state, with the live connection state.
    #[must_use]
    pub fn snapshot(&self) -> BulbControlState {
        let mut state = self.shared.state.borrow().clone();
        state.connection = self.shared.connection.state();
        state
    }

    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<BulbControlState> {
        self.shared.state.subscribe()
    }

    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<BulbEvent> {
        self.shared.events.subscribe()
    }

    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.shared.connection.state()
    }

    /// Watch every connection transition, including `Connecting` and
    /// `Disconnecting`.
    #[must_use]
    pub fn subscribe_connection(&self) -> watch::Receiver<ConnectionState> {
        self.shared.connection.subscribe()
    }

    #[must_use]
    pub fn identity(&self) -> &DeviceIdentity {
        self.shared.connection.identity()
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        self.shared.connection.transport()
    }

    #[must_use]
    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    fn is_recording(&self) -> bool {
        self.shared.state.borrow().recording
    }

    fn lock_link_watch(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.link_watch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── start-up ────────────────────────────────────────────────────────

    /// Probe speech availability, ask for the microphone and check that a
    /// BLE adapter is usable. Nothing here is fatal.
    #[tracing::instrument(skip(self))]
    pub async fn initialize(&self) -> Readiness {
        let speech_available = self.speech.check_availability().await;
        let microphone_granted = speech_available && self.speech.request_permission().await;
        let adapter_enabled = self.transport().is_adapter_enabled().await;

        self.shared.state.send_modify(|state| {
            state.speech_available = speech_available;
            state.microphone_granted = microphone_granted;
        });

        if !speech_available {
            tracing::warn!("speech recognition not supported on this device");
            self.shared.notice(Notice::SpeechUnavailable);
        } else if !microphone_granted {
            tracing::warn!("microphone permission denied");
            self.shared.notice(Notice::PermissionDenied);
        }
        if !adapter_enabled {
            tracing::warn!("bluetooth adapter is not enabled");
        }

        let readiness = Readiness {
            speech_available,
            microphone_granted,
            adapter_enabled,
        };
        tracing::info!(
            speech_available,
            microphone_granted,
            adapter_enabled,
            "controller initialized"
        );
        readiness
    }

    // ── connection ──────────────────────────────────────────────────────

    /// Connect, then put the bulb in its baseline (on, black) state.
    ///
    /// # Errors
    ///
    /// See [`Connection::connect`].
    #[tracing::instrument(skip(self))]
    pub async fn connect(&self) -> Result<(), BulbError> {
        // Subscribe first so a drop right after connecting is not missed.
        let link_events = self.transport().link_events();

        let result = self.shared.connection.connect().await;
        self.shared.sync_connection();
        result?;

        self.watch_link(link_events);
        self.shared
            .apply_color(Color::BLACK, ColorSource::Baseline)
            .await;
        Ok(())
    }

    fn watch_link(&self, mut link_events: broadcast::Receiver<LinkEvent>) {
        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(async move {
            loop {
                match link_events.recv().await {
                    Ok(LinkEvent::Lost { address }) => {
                        let ours = &shared.connection.identity().address;
                        if !address.eq_ignore_ascii_case(ours) {
                            continue;
                        }
                        if shared.connection.mark_link_lost() {
                            shared.sync_connection();
                        }
                        break;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "link events lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        if let Some(previous) = self.lock_link_watch().replace(task) {
            previous.abort();
        }
    }

    /// Disconnect. The displayed color is cleared only when the bulb
    /// acknowledged.
    ///
    /// # Errors
    ///
    /// - [`BulbError::NotConnected`] unless currently connected.
    /// - [`BulbError::Disconnect`] when the transport failed; the
    ///   connection is still considered closed.
    #[tracing::instrument(skip(self))]
    pub async fn disconnect(&self) -> Result<(), BulbError> {
        if !self.connection_state().is_connected() {
            return Err(BulbError::NotConnected);
        }
        if let Some(watch) = self.lock_link_watch().take() {
            watch.abort();
        }

        let result = self.shared.connection.disconnect().await;
        self.shared.sync_connection();

        match result {
            Ok(()) => {
                self.shared.clear_color();
                Ok(())
            }
            Err(err) => {
                self.shared.notice(Notice::DisconnectError {
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    // ── picker ──────────────────────────────────────────────────────────

    /// Apply a `#RRGGBB` color from the picker.
    ///
    /// # Errors
    ///
    /// Returns [`BulbError::InvalidColorFormat`]; nothing is displayed or
    /// written in that case.
    #[tracing::instrument(skip(self))]
    pub async fn select_color(&self, hex: &str) -> Result<Delivery, BulbError> {
        let color = match Color::from_hex(hex) {
            Ok(color) => color,
            Err(err) => {
                tracing::warn!(input = %hex, "rejected picker color");
                self.shared.notice(Notice::InvalidColor {
                    input: hex.to_owned(),
                });
                return Err(err);
            }
        };
        Ok(self.shared.apply_color(color, ColorSource::Picker).await)
    }

    // ── voice ───────────────────────────────────────────────────────────

    /// Start or stop recording. Resolves to whether recording is now on.
    ///
    /// Stopping resolves the last heard phrase, unless a finished result
    /// was already applied.
    ///
    /// # Errors
    ///
    /// Starting fails with [`BulbError::SpeechUnavailable`],
    /// [`BulbError::PermissionDenied`] or whatever the recognizer reports;
    /// recording stays off in every case.
    #[tracing::instrument(skip(self))]
    pub async fn toggle_recording(&self) -> Result<bool, BulbError> {
        let mut sessions = self.sessions.lock().await;
        if self.is_recording() {
            self.stop_recording(&mut sessions).await;
            Ok(false)
        } else {
            self.start_recording(&mut sessions).await?;
            Ok(true)
        }
    }

    async fn start_recording(&self, sessions: &mut Sessions) -> Result<(), BulbError> {
        let (available, granted) = {
            let state = self.shared.state.borrow();
            (state.speech_available, state.microphone_granted)
        };
        if !available {
            tracing::warn!("speech recognition not supported on this device");
            self.shared.notice(Notice::SpeechUnavailable);
            return Err(BulbError::SpeechUnavailable);
        }
        if !granted {
            tracing::warn!("microphone permission not granted");
            self.shared.notice(Notice::PermissionDenied);
            return Err(BulbError::PermissionDenied);
        }

        self.shared.clear_color();
        *self.shared.lock_session() = Some(SpeechSession::start());
        self.shared.set_recording(true);

        let (results, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(forward_transcriptions(
            Arc::clone(&self.shared),
            receiver,
            self.config.resolve_on_final,
        ));

        let started = self
            .speech
            .start_listening(self.config.listen.clone(), results)
            .await
            .and_then(|started| {
                if started {
                    Ok(())
                } else {
                    Err(BulbError::SpeechFailed {
                        reason: "recognizer did not start".to_owned(),
                    })
                }
            });

        match started {
            Ok(()) => {
                tracing::info!(locale = %self.config.listen.locale, "listening");
                sessions.speech = Some(task);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%err, "failed to start listening");
                task.abort();
                *self.shared.lock_session() = None;
                self.shared.set_recording(false);
                self.shared.notice(Notice::SpeechFailed {
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn stop_recording(&self, sessions: &mut Sessions) {
        // Close the session before awaiting anything so late results are
        // ignored.
        let phrase = self.shared.close_session();
        self.shared.set_recording(false);
        if let Some(task) = sessions.speech.take() {
            task.abort();
        }

        if let Err(err) = self.speech.stop_listening().await {
            tracing::warn!(%err, "failed to stop listening");
            self.shared.notice(Notice::SpeechFailed {
                reason: err.to_string(),
            });
        }

        match phrase {
            Some(phrase) => {
                // Failures are already reported as notices.
                let _ = self.shared.apply_phrase(&phrase).await;
            }
            None => tracing::debug!("recording stopped with nothing to resolve"),
        }
    }

    // ── motion ──────────────────────────────────────────────────────────

    /// Start or stop the accelerometer stream. Resolves to whether it is
    /// now streaming.
    #[tracing::instrument(skip(self))]
    pub async fn toggle_streaming(&self) -> bool {
        let mut sessions = self.sessions.lock().await;
        if sessions.motion.is_some() || self.motion.is_streaming() {
            self.stop_streaming(&mut sessions).await;
            false
        } else {
            self.start_streaming(&mut sessions);
            true
        }
    }

    fn start_streaming(&self, sessions: &mut Sessions) {
        self.shared.clear_color();

        let (samples, receiver) = watch::channel(None);
        self.motion.start_stream(samples);

        let shared = Arc::clone(&self.shared);
        let handle = throttle::spawn(
            self.config.throttle_interval,
            WatchStream::from_changes(receiver).filter_map(|sample| sample),
            move |sample: AxisSample| {
                let shared = Arc::clone(&shared);
                async move {
                    shared.apply_color(sample.to_color(), ColorSource::Motion).await;
                }
            },
        );
        sessions.motion = Some(handle);
        self.shared.set_streaming(true);

        tracing::info!(
            interval_ms = u64::try_from(self.config.throttle_interval.as_millis()).unwrap_or(u64::MAX),
            "accelerometer streaming"
        );
    }

    async fn stop_streaming(&self, sessions: &mut Sessions) {
        if let Some(handle) = sessions.motion.take() {
            handle.stop().await;
        }
        self.motion.stop_stream();
        self.shared.set_streaming(false);
        tracing::info!("accelerometer stopped");
    }

    // ── teardown ────────────────────────────────────────────────────────

    /// Stop every session and drop the link, if any. Errors are logged.
    #[tracing::instrument(skip(self))]
    pub async fn shutdown(&self) {
        {
            let mut sessions = self.sessions.lock().await;
            if sessions.motion.is_some() {
                self.stop_streaming(&mut sessions).await;
            }
            if self.is_recording() {
                drop(self.shared.close_session());
                self.shared.set_recording(false);
                if let Some(task) = sessions.speech.take() {
                    task.abort();
                }
                if let Err(err) = self.speech.stop_listening().await {
                    tracing::warn!(%err, "failed to stop listening");
                }
            }
        }

        if self.connection_state().is_connected() {
            if let Err(err) = self.disconnect().await {
                tracing::warn!(%err, "disconnect during shutdown failed");
            }
        }
    }
}

impl<T, S, M> Drop for BulbController<T, S, M> {
    fn drop(&mut self) {
        let link_watch = self
            .link_watch
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = link_watch.take() {
            task.abort();
        }

        let sessions = self.sessions.get_mut();
        if let Some(task) = sessions.speech.take() {
            task.abort();
        }
        if let Some(handle) = sessions.motion.take() {
            handle.abort();
        }
    }
}
