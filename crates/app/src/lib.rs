//! # lumibulb-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** the outside world must implement:
//!   - `BulbTransport` — connect, disconnect, write-without-response
//!   - `SpeechRecognizer` — availability, permission, start/stop listening
//!   - `MotionSensor` — start/stop the accelerometer stream
//! - Rate-limit sensor samples (`throttle`)
//! - Own the single bulb connection (`connection`)
//! - Route color intents from picker, voice and motion to the bulb
//!   (`controller`) and publish observable state and events
//!
//! ## Dependency rule
//! Depends on `lumibulb-domain` only (plus `tokio` for channels, tasks and
//! timers). Never imports adapter crates. Adapters depend on *this* crate,
//! not the reverse.

pub mod connection;
pub mod controller;
pub mod event_bus;
pub mod ports;
pub mod state;
pub mod throttle;
