//! Wire protocol for Broadlink-family IR/RF blasters and Wi-Fi outlets.
//!
//! This crate is the pure codec layer: it builds and parses the UDP frames
//! the devices speak (checksummed headers, AES-128-CBC payloads, the
//! broadcast discovery frame and its timezone/date block) and carries the
//! static device-type capability table. It performs no I/O; the session and
//! socket handling lives in `broadlink-client`.

mod clock;
mod crypto;
mod error;

pub mod device_types;
pub mod frame;

pub use clock::TimestampBlock;
pub use crypto::{decrypt, encrypt, INITIAL_KEY, INITIAL_VECTOR};
pub use device_types::DeviceKind;
pub use error::{CodecError, Result};
pub use frame::DeviceResponse;
