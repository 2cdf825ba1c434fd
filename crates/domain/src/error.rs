//! Common error types used across the workspace.
//!
//! Every failure in lumibulb is recoverable: none of these variants should
//! terminate the application. Adapter crates define their own error enums
//! and convert into [`BulbError`] at the port boundary.

/// Boxed error coming from an underlying transport or collaborator.
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Base error type for lumibulb.
#[derive(Debug, thiserror::Error)]
pub enum BulbError {
    /// A hex color string did not match `#RRGGBB`.
    #[error("invalid color format: {input:?}")]
    InvalidColorFormat { input: String },

    /// A spoken phrase matched none of the known color names.
    #[error("unknown color name: {name:?}")]
    UnknownColorName { name: String },

    /// A write was attempted while the bulb is not connected.
    #[error("bulb is not connected")]
    NotConnected,

    /// A connect was requested while a connection is in flight or established.
    #[error("already connecting or connected")]
    AlreadyConnectingOrConnected,

    /// The underlying transport could not connect to the bulb.
    #[error("connection failed")]
    ConnectionFailed(#[source] SourceError),

    /// The underlying transport reported an error while disconnecting.
    ///
    /// The connection is considered closed regardless.
    #[error("disconnect error")]
    Disconnect(#[source] SourceError),

    /// Speech recognition is not supported on this device.
    #[error("speech recognition unavailable")]
    SpeechUnavailable,

    /// The user refused a required permission (microphone).
    #[error("permission denied")]
    PermissionDenied,

    /// The speech recognizer failed to start or stop listening.
    #[error("speech recognizer failed: {reason}")]
    SpeechFailed { reason: String },

    /// Any other transport-level failure (e.g. a rejected write).
    #[error("transport error")]
    Transport(#[source] SourceError),
}

impl BulbError {
    /// Whether this error is the "write skipped while disconnected" status.
    #[must_use]
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::NotConnected)
    }
}
