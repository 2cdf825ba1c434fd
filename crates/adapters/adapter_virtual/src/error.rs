//! Virtual adapter error types.

use lumibulb_domain::error::BulbError;

/// Failures the simulated devices can be told to produce.
#[derive(Debug, thiserror::Error)]
pub enum VirtualError {
    /// Nothing answers at that address.
    #[error("no virtual bulb at {address}")]
    Unreachable { address: String },

    /// The bulb did not answer the disconnect request.
    #[error("virtual bulb did not answer")]
    NoAnswer,

    #[error("virtual bulb is not linked")]
    NotLinked,

    /// The write was refused by the simulated radio.
    #[error("write rejected")]
    WriteRejected,

    /// A frame that does not follow the bulb's layout.
    #[error("malformed frame {bytes:?}")]
    MalformedFrame { bytes: Vec<u8> },
}

impl VirtualError {
    /// Convert into a [`BulbError`] for propagation across port boundaries.
    #[must_use]
    pub fn into_domain(self) -> BulbError {
        match self {
            Self::NotLinked => BulbError::NotConnected,
            other => BulbError::Transport(Box::new(other)),
        }
    }
}

impl From<VirtualError> for BulbError {
    fn from(err: VirtualError) -> Self {
        err.into_domain()
    }
}
