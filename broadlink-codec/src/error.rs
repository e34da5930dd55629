//! Error types for the codec layer.

use thiserror::Error;

/// Errors raised while building or parsing device packets.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The response packet is shorter than a header plus one cipher block.
    #[error("received a packet with a length of {0} which is too short")]
    ResponseTooShort(usize),

    /// The encrypted tail is not a whole number of AES blocks.
    #[error("encrypted payload of {0} bytes is not a multiple of the block size")]
    MisalignedPayload(usize),

    /// The response carries a command byte we do not understand.
    #[error("unhandled command - 0x{0:02x}")]
    UnhandledCommand(u8),

    /// An authentication grant did not contain a full id and key.
    #[error("authentication grant payload is truncated")]
    TruncatedAuthGrant,
}

/// Convenience Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
