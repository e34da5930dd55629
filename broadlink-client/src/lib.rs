//! Device sessions and the network registry for Broadlink hardware.
//!
//! A [`Device`] is one authenticated session with a physical blaster or
//! outlet; the [`Registry`] owns every device, discovers them by UDP
//! broadcast (or ingests manually configured ones) and routes operations to
//! them by IP or MAC.
//!
//! All I/O here is blocking; callers are expected to drive devices from a
//! single worker thread so that no two exchanges ever overlap on the wire.

mod device;
mod error;
mod registry;

pub use device::{Device, DEFAULT_CONTROL_PORT, DEFAULT_TIMEOUT, LEARN_WINDOW};
pub use error::{ClientError, Result};
pub use registry::Registry;
