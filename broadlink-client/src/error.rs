//! Error types for device sessions and the registry.

use broadlink_codec::CodecError;
use thiserror::Error;

/// Errors raised while talking to devices or resolving them.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    /// The device did not answer within the read deadline.
    #[error("device did not respond within {0} seconds")]
    Timeout(u64),

    /// The device answered but reported no usable result.
    #[error("device returned no result")]
    EmptyResponse,

    /// The device answered with something other than what the operation
    /// expects, e.g. a state readout where an acknowledgment was required.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Learning did not produce a code within the deadline.
    #[error("learning timeout")]
    LearnTimeout,

    #[error("no devices")]
    NoDevices,

    #[error("{0} is not a known device")]
    UnknownDevice(String),

    #[error("device type 0x{0:04x} is not supported")]
    UnsupportedDeviceType(u16),

    /// The device exists but its hardware cannot perform the operation.
    #[error("device {device} of type 0x{device_type:04x} is not capable of {operation}")]
    NotCapable {
        device: String,
        device_type: u16,
        operation: &'static str,
    },

    #[error("power outlets only accept 0, 00, 1 or 01 - got {0:?} instead")]
    InvalidPowerState(String),

    #[error("session key must be exactly 16 hex-encoded bytes")]
    InvalidSessionKey,

    #[error("session id must be exactly 4 hex-encoded bytes")]
    InvalidSessionId,
}

/// Convenience Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
