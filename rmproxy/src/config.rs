//! Command-line and environment configuration.

use std::io::Read;
use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;

use crate::error::{ProxyError, Result};

/// Proxy configuration. Every flag may also be set through the environment
/// variable carrying its uppercase name.
#[derive(Parser, Debug)]
#[command(name = "rmproxy")]
#[command(about = "HTTP proxy for Broadlink IR/RF blasters and smart outlets")]
pub struct Args {
    /// HTTP listener port
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Key used to authenticate incoming requests; a required part of all
    /// incoming URLs
    #[arg(long, env = "KEY")]
    pub key: String,

    /// Path to the JSON file specifying the room configuration
    #[arg(long, env = "ROOMS")]
    pub rooms: PathBuf,

    /// Path to the JSON file listing all remote commands
    #[arg(long, env = "COMMANDS")]
    pub commands: PathBuf,

    /// Path to the JSON file specifying macros
    #[arg(long, env = "MACROS")]
    pub macros: Option<PathBuf>,

    /// Path to the JSON file specifying manual device configurations;
    /// when given, discovery is skipped
    #[arg(long, env = "DEVICECONFIG")]
    pub deviceconfig: Option<PathBuf>,

    /// Path to the JSON file specifying the Home Assistant connection
    #[arg(long, env = "HOMEASSISTANT")]
    pub homeassistant: Option<PathBuf>,

    /// Skip the device discovery process
    #[arg(long, env = "SKIPDISCOVERY")]
    pub skipdiscovery: bool,
}

/// A manually configured device, bypassing discovery and authentication.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    pub ip: String,
    #[serde(default)]
    pub mac: String,
    pub key: String,
    pub id: String,
    #[serde(rename = "type")]
    pub device_type: u16,
}

/// Read the manual device configuration stream.
pub fn load_device_configs(reader: impl Read) -> Result<Vec<DeviceConfig>> {
    serde_json::from_reader(reader).map_err(|e| ProxyError::json("device config", e))
}
