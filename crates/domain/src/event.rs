//! Events — timestamped records of what happened to the bulb and its inputs.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::color::Color;

/// UTC timestamp attached to every event.
pub type Timestamp = DateTime<Utc>;

/// Which input produced a color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSource {
    Picker,
    Voice,
    Motion,
    /// The all-black write issued right after connecting.
    Baseline,
}

impl fmt::Display for ColorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Picker => f.write_str("picker"),
            Self::Voice => f.write_str("voice"),
            Self::Motion => f.write_str("motion"),
            Self::Baseline => f.write_str("baseline"),
        }
    }
}

/// What became of a color write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    /// Handed to the transport (no acknowledgement is awaited).
    Sent,
    /// Not attempted because the bulb is not connected.
    Skipped,
    /// The transport rejected the write.
    Failed,
}

/// A user-facing message. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum Notice {
    InvalidColor { input: String },
    UnknownColor { name: String },
    SpeechUnavailable,
    PermissionDenied,
    SpeechFailed { reason: String },
    DisconnectError { reason: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidColor { input } => write!(f, "{input}: not a #RRGGBB color."),
            Self::UnknownColor { name } => write!(
                f,
                "{name}: sorry, this color is not present in the list of accepted colors."
            ),
            Self::SpeechUnavailable => {
                f.write_str("Speech recognition not supported on this device.")
            }
            Self::PermissionDenied => f.write_str("Microphone permission was denied."),
            Self::SpeechFailed { reason } => write!(f, "Speech recognition failed: {reason}"),
            Self::DisconnectError { reason } => {
                write!(f, "Bulb did not acknowledge the disconnect: {reason}")
            }
        }
    }
}

/// Discriminant of a [`BulbEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    Connected { address: String },
    Disconnected { address: String },
    ConnectionFailed { address: String, reason: String },
    /// The peripheral dropped the link on its own.
    LinkLost { address: String },
    ColorApplied {
        color: Color,
        source: ColorSource,
        delivery: Delivery,
    },
    ColorCleared,
    RecordingChanged { recording: bool },
    /// The recognizer heard something while recording.
    Transcribed { text: String, finished: bool },
    StreamingChanged { streaming: bool },
    Notice(Notice),
}

/// A timestamped event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulbEvent {
    #[serde(flatten)]
    pub kind: EventKind,
    pub timestamp: Timestamp,
}

impl BulbEvent {
    /// Stamp `kind` with the current time.
    #[must_use]
    pub fn now(kind: EventKind) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_stamp_event_with_current_time() {
        let before = Utc::now();
        let event = BulbEvent::now(EventKind::ColorCleared);
        assert!(event.timestamp >= before);
        assert!(event.timestamp <= Utc::now());
    }

    #[test]
    fn should_serialize_kind_inline() {
        let event = BulbEvent::now(EventKind::ColorApplied {
            color: Color::new(255, 255, 0),
            source: ColorSource::Voice,
            delivery: Delivery::Skipped,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "color_applied");
        assert_eq!(json["color"], "#ffff00");
        assert_eq!(json["source"], "voice");
        assert_eq!(json["delivery"], "skipped");
    }

    #[test]
    fn should_render_unknown_color_notice_like_the_alert() {
        let notice = Notice::UnknownColor {
            name: "teal".to_owned(),
        };
        assert_eq!(
            notice.to_string(),
            "teal: sorry, this color is not present in the list of accepted colors."
        );
    }
}
