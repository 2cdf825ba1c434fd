//! # lumibulb-adapter-virtual
//!
//! In-memory stand-ins for the three outside collaborators, for running
//! without a radio, a microphone or an accelerometer.
//!
//! ## Provided devices
//!
//! | Device | Port | Behaviour |
//! |--------|------|-----------|
//! | [`VirtualBulb`] | `BulbTransport` | Decodes and records every frame, can refuse to connect and can power off |
//! | [`ScriptedSpeech`] | `SpeechRecognizer` | Emits whatever transcriptions it is told to hear |
//! | [`VirtualMotion`] | `MotionSensor` | Forwards hand-fed axis samples, dropping them when the consumer lags |
//!
//! ## Dependency rule
//!
//! Depends on `lumibulb-app` (port traits) and `lumibulb-domain` only.

mod devices;
mod error;

pub use devices::{ScriptedSpeech, VirtualBulb, VirtualMotion};
pub use error::VirtualError;
