//! The proxy application: rooms, commands and macros on top of the
//! Broadlink client, a single dispatcher worker that serializes all device
//! traffic, and the warp HTTP façade that drives it.

pub mod assets;
pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod homeassistant;
pub mod macros;
pub mod message;
pub mod server;

pub use catalog::Catalog;
pub use dispatcher::{Command, Dispatcher};
pub use error::{ProxyError, Result};
pub use message::{Instruction, Message};
