//! A session with one physical Broadlink device.

use std::net::UdpSocket;
use std::time::{Duration, Instant};

use broadlink_codec::{frame, DeviceKind, DeviceResponse};
use tracing::{debug, trace, warn};

use crate::error::{ClientError, Result};

/// UDP port the devices listen on for control traffic.
pub const DEFAULT_CONTROL_PORT: u16 = frame::DEVICE_PORT;

/// Default per-exchange read deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Wall-clock window granted to a learn operation.
pub const LEARN_WINDOW: Duration = Duration::from_secs(20);

/// One session with a blaster or outlet.
///
/// The session key, id and packet counter are only ever touched by the
/// device's own methods; the registry owns the device and hands out one
/// exclusive borrow at a time, so no locking is needed.
pub struct Device {
    remote_ip: String,
    control_port: u16,
    /// MAC in wire order (reversed relative to its printed form).
    mac: [u8; 6],
    device_type: u16,
    timeout: Duration,
    key: [u8; 16],
    id: [u8; 4],
    count: u16,
}

impl Device {
    /// Create an unauthenticated session. [`Device::authenticate`] must be
    /// called exactly once before any other operation.
    pub fn new(remote_ip: String, mac: [u8; 6], device_type: u16, timeout: Duration) -> Self {
        Self {
            remote_ip,
            control_port: DEFAULT_CONTROL_PORT,
            mac,
            device_type,
            timeout,
            key: broadlink_codec::INITIAL_KEY,
            id: [0; 4],
            count: rand::random(),
        }
    }

    /// Create a session from an already-negotiated key and id, bypassing
    /// authentication. Used for manually configured devices.
    pub fn with_session(
        remote_ip: String,
        mac: [u8; 6],
        device_type: u16,
        timeout: Duration,
        key: [u8; 16],
        id: [u8; 4],
    ) -> Self {
        let mut device = Self::new(remote_ip, mac, device_type, timeout);
        device.key = key;
        device.id = id;
        device
    }

    pub fn remote_ip(&self) -> &str {
        &self.remote_ip
    }

    /// MAC in wire order.
    pub fn mac(&self) -> [u8; 6] {
        self.mac
    }

    /// MAC in its printed form, lowercase and colon-separated.
    pub fn mac_string(&self) -> String {
        self.mac
            .iter()
            .rev()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(":")
    }

    pub fn device_type(&self) -> u16 {
        self.device_type
    }

    /// Capability record for this device's type code.
    pub fn kind(&self) -> DeviceKind {
        broadlink_codec::device_types::lookup(self.device_type)
    }

    /// Whether a session has been established (or supplied manually).
    pub fn is_authenticated(&self) -> bool {
        self.id != [0; 4]
    }

    /// Override the control port. Real hardware always listens on port 80;
    /// tests point this at a loopback stand-in.
    pub fn set_control_port(&mut self, port: u16) {
        self.control_port = port;
    }

    /// Perform the authentication handshake and install the session key
    /// and id the device hands back.
    pub fn authenticate(&mut self) -> Result<()> {
        match self.exchange(frame::CMD_AUTH, &auth_payload())? {
            DeviceResponse::AuthGrant { id, key } => {
                self.id = id;
                self.key = key;
                debug!(device = %self.remote_ip, "session established");
                Ok(())
            }
            DeviceResponse::Empty => Err(ClientError::EmptyResponse),
            other => Err(ClientError::UnexpectedResponse(format!(
                "expected an authentication grant, got {:?}",
                other
            ))),
        }
    }

    /// Transmit a hex-encoded IR/RF code.
    pub fn send_code(&mut self, code: &str) -> Result<()> {
        let data = hex::decode(code)?;
        let mut payload = vec![0x02, 0x00, 0x00, 0x00];
        payload.extend_from_slice(&data);

        match self.exchange(frame::CMD_DATA, &payload)? {
            DeviceResponse::Ack => Ok(()),
            DeviceResponse::Empty => Err(ClientError::EmptyResponse),
            other => Err(ClientError::UnexpectedResponse(format!(
                "expected a command acknowledgment, got {:?}",
                other
            ))),
        }
    }

    /// Switch a power outlet on or off. Accepts `"0"`, `"00"`, `"1"` and
    /// `"01"` only.
    pub fn set_power_state(&mut self, state: &str) -> Result<()> {
        let on = parse_power_arg(state)?;
        let mut payload = [0u8; 16];
        payload[0] = 0x02;
        payload[4] = on;

        // The outlets do answer, but the body carries nothing we need.
        self.exchange(frame::CMD_DATA, &payload)?;
        Ok(())
    }

    /// Query a power outlet's current state.
    pub fn get_power_state(&mut self) -> Result<bool> {
        let payload = frame::basic_request(frame::SUB_QUERY_STATE);
        match self.exchange(frame::CMD_DATA, &payload)? {
            DeviceResponse::State { value, .. } => Ok(value & 1 == 1),
            DeviceResponse::Empty => Err(ClientError::EmptyResponse),
            other => Err(ClientError::UnexpectedResponse(format!(
                "expected a state readout, got {:?}",
                other
            ))),
        }
    }

    /// Read the ambient temperature from a blaster that carries a sensor.
    pub fn check_temperature(&mut self) -> Result<f32> {
        let payload = frame::basic_request(frame::SUB_QUERY_STATE);
        match self.exchange(frame::CMD_DATA, &payload)? {
            DeviceResponse::State { value, tenths } => {
                Ok(value as f32 + tenths as f32 / 10.0)
            }
            DeviceResponse::Empty => Err(ClientError::EmptyResponse),
            other => Err(ClientError::UnexpectedResponse(format!(
                "expected a state readout, got {:?}",
                other
            ))),
        }
    }

    /// Put the device into IR learning mode and wait for a captured code,
    /// hex-encoded. Gives up after [`LEARN_WINDOW`].
    pub fn learn_ir(&mut self) -> Result<String> {
        self.learn_ir_within(LEARN_WINDOW)
    }

    /// IR learn with an explicit wall-clock window.
    pub fn learn_ir_within(&mut self, window: Duration) -> Result<String> {
        let deadline = Instant::now() + window;
        self.exchange(
            frame::CMD_DATA,
            &frame::basic_request(frame::SUB_ENTER_LEARNING),
        )?;
        self.poll_for_code(deadline)
    }

    /// Sweep for an RF code and wait for the capture, hex-encoded. Gives up
    /// after [`LEARN_WINDOW`].
    pub fn learn_rf(&mut self) -> Result<String> {
        self.learn_rf_within(LEARN_WINDOW)
    }

    /// RF learn with an explicit wall-clock window covering both stages.
    pub fn learn_rf_within(&mut self, window: Duration) -> Result<String> {
        let deadline = Instant::now() + window;
        self.exchange(frame::CMD_DATA, &frame::basic_request(frame::SUB_RF_SWEEP))?;

        // Stage one: wait for the device to lock onto a frequency while the
        // user holds the remote button down.
        loop {
            if Instant::now() >= deadline {
                self.cancel_learn();
                return Err(ClientError::LearnTimeout);
            }
            match self.exchange(
                frame::CMD_DATA,
                &frame::basic_request(frame::SUB_RF_CHECK_FREQUENCY),
            ) {
                Ok(DeviceResponse::RfFrequencyLocked(true)) => break,
                Ok(_) => continue,
                Err(e) => {
                    trace!(device = %self.remote_ip, "frequency poll: {e}");
                    continue;
                }
            }
        }

        // Stage two: ask for the code at the locked frequency, then poll
        // for the capture like an IR learn.
        self.exchange(
            frame::CMD_DATA,
            &frame::basic_request(frame::SUB_RF_FIND_CODE),
        )?;
        self.poll_for_code(deadline)
    }

    /// Poll check-data until the device hands over a captured code or the
    /// deadline passes. Empty answers and poll failures just mean the user
    /// has not pressed a button yet.
    fn poll_for_code(&mut self, deadline: Instant) -> Result<String> {
        loop {
            if Instant::now() >= deadline {
                self.cancel_learn();
                return Err(ClientError::LearnTimeout);
            }
            match self.exchange(
                frame::CMD_DATA,
                &frame::basic_request(frame::SUB_CHECK_DATA),
            ) {
                Ok(DeviceResponse::Code(data)) => return Ok(hex::encode(data)),
                Ok(_) => continue,
                Err(e) => {
                    trace!(device = %self.remote_ip, "check-data poll: {e}");
                    continue;
                }
            }
        }
    }

    /// Tell the device to leave learning mode. Best effort: the device does
    /// not acknowledge it.
    fn cancel_learn(&mut self) {
        if let Err(e) = self.send_only(
            frame::CMD_DATA,
            &frame::basic_request(frame::SUB_CANCEL_LEARNING),
        ) {
            warn!(device = %self.remote_ip, "could not cancel learning: {e}");
        }
    }

    /// One request/response exchange. The socket is bound for exactly this
    /// exchange; dropping it on any exit path closes it.
    fn exchange(&mut self, command: u8, payload: &[u8]) -> Result<DeviceResponse> {
        let socket = UdpSocket::bind(("0.0.0.0", 0))?;
        socket.set_read_timeout(Some(self.timeout))?;

        self.send_on(&socket, command, payload)?;

        let mut buf = [0u8; 1024];
        let (len, _) = socket.recv_from(&mut buf).map_err(|e| {
            if matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            ) {
                ClientError::Timeout(self.timeout.as_secs())
            } else {
                ClientError::Io(e)
            }
        })?;

        Ok(frame::parse_response(&self.key, &buf[..len])?)
    }

    /// Fire-and-forget transmission on a throwaway socket.
    fn send_only(&mut self, command: u8, payload: &[u8]) -> Result<()> {
        let socket = UdpSocket::bind(("0.0.0.0", 0))?;
        self.send_on(&socket, command, payload)
    }

    fn send_on(&mut self, socket: &UdpSocket, command: u8, payload: &[u8]) -> Result<()> {
        self.count = self.count.wrapping_add(1);
        let packet = frame::build_command_packet(
            &self.key,
            &self.mac,
            &self.id,
            self.count,
            command,
            payload,
        );
        socket.send_to(&packet, (self.remote_ip.as_str(), self.control_port))?;
        Ok(())
    }
}

/// The 0x50-byte authentication payload: a spoofed "Test  1" client
/// identity the firmware accepts.
fn auth_payload() -> [u8; 0x50] {
    let mut payload = [0u8; 0x50];
    for b in &mut payload[0x04..0x13] {
        *b = 0x31;
    }
    payload[0x1e] = 0x01;
    payload[0x2d] = 0x01;
    payload[0x30..0x37].copy_from_slice(b"Test  1");
    payload
}

fn parse_power_arg(state: &str) -> Result<u8> {
    match state {
        "0" | "00" => Ok(0),
        "1" | "01" => Ok(1),
        other => Err(ClientError::InvalidPowerState(other.to_string())),
    }
}
