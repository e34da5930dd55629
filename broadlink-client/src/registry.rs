//! The registry: every known device, indexed by IP and MAC.

use std::collections::HashMap;
use std::net::UdpSocket;
use std::time::Duration;

use broadlink_codec::{device_types, frame, TimestampBlock};
use tracing::{debug, info, warn};

use crate::device::Device;
use crate::error::{ClientError, Result};

const BROADCAST_ADDR: (&str, u16) = ("255.255.255.255", frame::DEVICE_PORT);

/// Owns all devices. Both lookup indices point at the same storage; devices
/// are only ever inserted, never removed at runtime.
pub struct Registry {
    timeout: Duration,
    devices: Vec<Device>,
    lookup: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_timeout(crate::device::DEFAULT_TIMEOUT)
    }

    /// Use a custom read deadline for discovery and for every device
    /// created afterwards.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            devices: Vec::new(),
            lookup: HashMap::new(),
        }
    }

    /// Number of devices currently registered.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Iterate over every registered device in insertion order.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter()
    }

    /// Broadcast a discovery frame and register every supported device that
    /// answers before the read deadline lapses. Returns how many devices
    /// were added.
    pub fn discover(&mut self) -> Result<usize> {
        let socket = UdpSocket::bind(("0.0.0.0", 0))?;
        socket.set_broadcast(true)?;
        socket.set_read_timeout(Some(self.timeout))?;

        let local = socket.local_addr()?;
        info!("listening for discovery replies on {local}");
        let local_ip = match local.ip() {
            std::net::IpAddr::V4(v4) => v4.octets(),
            _ => [0, 0, 0, 0],
        };
        let packet = frame::build_discovery_packet(&TimestampBlock::now(), local_ip, local.port());
        socket.send_to(&packet, BROADCAST_ADDR)?;

        let mut added = 0;
        let mut buf = [0u8; 1024];
        loop {
            match socket.recv_from(&mut buf) {
                Ok((len, source)) => {
                    debug!("received a discovery reply of {len} bytes from {source}");
                    if self.ingest_discovery_reply(&buf[..len], source.ip().to_string()) {
                        added += 1;
                    }
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) =>
                {
                    break;
                }
                Err(e) => {
                    warn!("error reading discovery reply: {e}");
                }
            }
        }
        Ok(added)
    }

    fn ingest_discovery_reply(&mut self, packet: &[u8], ip: String) -> bool {
        let Some(reply) = frame::parse_discovery_reply(packet) else {
            debug!("ignoring discovery reply because it is too short");
            return false;
        };

        let kind = device_types::lookup(reply.device_type);
        let mac = format_mac(&reply.mac);

        if !kind.known {
            info!(
                "unknown device (0x{:04x}) at address {ip}, MAC {mac}",
                reply.device_type
            );
            return false;
        }
        if !kind.supported {
            info!(
                "unsupported {} (0x{:04x}) found at address {ip}, MAC {mac} - skipping",
                kind.name, reply.device_type
            );
            return false;
        }
        if self.contains(&ip) || self.contains(&mac) {
            debug!("we already know about {ip}, MAC {mac} - skipping");
            return false;
        }

        let mut device = Device::new(ip.clone(), reply.mac, reply.device_type, self.timeout);
        if let Err(e) = device.authenticate() {
            warn!("could not authenticate with {} at {ip}: {e}", kind.name);
            return false;
        }

        info!(
            "found a supported {}, device type 0x{:04x} at address {ip}, MAC {mac}",
            kind.name, reply.device_type
        );
        self.insert(device, Some(mac));
        true
    }

    /// Register a device from configuration, bypassing authentication. The
    /// key and id must be exact-length hex; a malformed MAC only drops the
    /// MAC index entry. Duplicate IP or MAC is a silent skip.
    pub fn add_manual(
        &mut self,
        ip: &str,
        mac: &str,
        key: &str,
        id: &str,
        device_type: u16,
    ) -> Result<()> {
        let kind = device_types::lookup(device_type);
        if !kind.supported {
            return Err(ClientError::UnsupportedDeviceType(device_type));
        }

        let key: [u8; 16] = hex::decode(key)?
            .try_into()
            .map_err(|_| ClientError::InvalidSessionKey)?;
        let id: [u8; 4] = hex::decode(id)?
            .try_into()
            .map_err(|_| ClientError::InvalidSessionId)?;

        let mac_wire = parse_mac(mac);
        if mac_wire.is_none() && !mac.is_empty() {
            warn!("could not parse MAC {mac:?} for device {ip} - indexing by IP only");
        }

        if self.contains(ip) {
            info!("a device with IP {ip} already exists - skipping manual add");
            return Ok(());
        }
        let mac_label = mac_wire.as_ref().map(format_mac);
        if let Some(label) = &mac_label {
            if self.contains(label) {
                info!("a device with MAC {label} already exists - skipping manual add");
                return Ok(());
            }
        }

        let device = Device::with_session(
            ip.to_string(),
            mac_wire.unwrap_or_default(),
            device_type,
            self.timeout,
            key,
            id,
        );
        self.insert(device, mac_label);
        Ok(())
    }

    fn contains(&self, id: &str) -> bool {
        self.lookup.contains_key(&id.to_lowercase())
    }

    fn insert(&mut self, device: Device, mac_label: Option<String>) {
        let index = self.devices.len();
        let ip = device.remote_ip().to_lowercase();
        self.devices.push(device);
        self.lookup.insert(ip, index);
        if let Some(label) = mac_label {
            self.lookup.insert(label.to_lowercase(), index);
        }
    }

    /// Find a device by IP or MAC, case-insensitively. An empty id selects
    /// the first device that was registered.
    pub fn resolve(&mut self, id: &str) -> Result<&mut Device> {
        if self.devices.is_empty() {
            return Err(ClientError::NoDevices);
        }
        if id.is_empty() {
            return Ok(&mut self.devices[0]);
        }
        let index = *self
            .lookup
            .get(&id.to_lowercase())
            .ok_or_else(|| ClientError::UnknownDevice(id.to_string()))?;
        Ok(&mut self.devices[index])
    }

    /// Send an opaque payload to a device, dispatching on its capability:
    /// power outlets get a state change, blasters get a code transmission.
    pub fn execute(&mut self, id: &str, payload: &str) -> Result<()> {
        let device = self.resolve(id)?;
        let kind = device.kind();
        if kind.power {
            if payload.len() != 1 && payload.len() != 2 {
                return Err(ClientError::InvalidPowerState(payload.to_string()));
            }
            return device.set_power_state(payload);
        }
        if kind.ir || kind.rf {
            return device.send_code(payload);
        }
        Err(not_capable(device, "power control, IR and RF"))
    }

    /// Run an IR learn on a device and return the captured code.
    pub fn learn_ir(&mut self, id: &str) -> Result<String> {
        let device = self.resolve(id)?;
        if !device.kind().ir {
            return Err(not_capable(device, "learning IR codes"));
        }
        device.learn_ir()
    }

    /// Run an RF sweep/learn on a device and return the captured code.
    pub fn learn_rf(&mut self, id: &str) -> Result<String> {
        let device = self.resolve(id)?;
        if !device.kind().rf {
            return Err(not_capable(device, "learning RF codes"));
        }
        device.learn_rf()
    }

    /// Query a power outlet's state.
    pub fn power_state(&mut self, id: &str) -> Result<bool> {
        let device = self.resolve(id)?;
        if !device.kind().power {
            return Err(not_capable(device, "power control"));
        }
        device.get_power_state()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

fn not_capable(device: &Device, operation: &'static str) -> ClientError {
    ClientError::NotCapable {
        device: device.remote_ip().to_string(),
        device_type: device.device_type(),
        operation,
    }
}

/// Printed form of a wire-order MAC.
fn format_mac(wire: &[u8; 6]) -> String {
    wire.iter()
        .rev()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Parse a printed MAC (`aa:bb:cc:dd:ee:ff`, dashes also accepted) into
/// wire order. Returns `None` for anything malformed.
fn parse_mac(mac: &str) -> Option<[u8; 6]> {
    let parts: Vec<&str> = if mac.contains(':') {
        mac.split(':').collect()
    } else if mac.contains('-') {
        mac.split('-').collect()
    } else {
        return None;
    };
    if parts.len() != 6 {
        return None;
    }

    let mut wire = [0u8; 6];
    for (i, part) in parts.iter().enumerate() {
        if part.len() != 2 {
            return None;
        }
        // printed order is the reverse of wire order
        wire[5 - i] = u8::from_str_radix(part, 16).ok()?;
    }
    Some(wire)
}
