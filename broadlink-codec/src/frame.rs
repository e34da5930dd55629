//! Framing for the Broadlink UDP control protocol.
//!
//! Two frame shapes exist. Command frames carry a 0x38-byte header followed
//! by an AES-128-CBC encrypted payload; discovery frames are 48 cleartext
//! bytes broadcast to the whole subnet. Both are protected by the same
//! additive 16-bit checksum seeded with `0xBEAF`.

use crate::clock::TimestampBlock;
use crate::crypto;
use crate::error::{CodecError, Result};

/// Length of the command frame header.
pub const HEADER_LEN: usize = 0x38;

/// Shortest acceptable response: a header plus one cipher block.
pub const MIN_RESPONSE_LEN: usize = HEADER_LEN + 16;

/// Shortest acceptable discovery reply.
pub const MIN_DISCOVERY_REPLY_LEN: usize = 0x40;

/// UDP port the devices listen on.
pub const DEVICE_PORT: u16 = 80;

/// Request command byte: authentication.
pub const CMD_AUTH: u8 = 0x65;
/// Request command byte: everything else (send, learn, power, polls).
pub const CMD_DATA: u8 = 0x6a;
/// Response command byte: authentication grant.
pub const CMD_AUTH_ACK: u8 = 0xe9;
/// Response command bytes: data responses.
pub const CMD_DATA_ACK: u8 = 0xee;
pub const CMD_DATA_ACK_ALT: u8 = 0xef;

/// Subcommand byte of a basic request: query state / temperature.
pub const SUB_QUERY_STATE: u8 = 0x01;
/// Subcommand byte of a basic request: enter IR learning.
pub const SUB_ENTER_LEARNING: u8 = 0x03;
/// Subcommand byte of a basic request: poll for a captured code.
pub const SUB_CHECK_DATA: u8 = 0x04;
/// Subcommand byte of a basic request: start the RF frequency sweep.
pub const SUB_RF_SWEEP: u8 = 0x19;
/// Subcommand byte of a basic request: poll the frequency sweep.
pub const SUB_RF_CHECK_FREQUENCY: u8 = 0x1a;
/// Subcommand byte of a basic request: request the swept RF code.
pub const SUB_RF_FIND_CODE: u8 = 0x1b;
/// Subcommand byte of a basic request: abandon learning.
pub const SUB_CANCEL_LEARNING: u8 = 0x1e;

const MAGIC: [u8; 8] = [0x5a, 0xa5, 0xaa, 0x55, 0x5a, 0xa5, 0xaa, 0x55];

/// Additive checksum over a byte slice: seed `0xBEAF`, add each byte,
/// keep 16 bits.
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0xbeafu16, |sum, &b| sum.wrapping_add(b as u16))
}

/// A 16-byte zeroed payload whose first byte selects a subcommand.
pub fn basic_request(subcommand: u8) -> [u8; 16] {
    let mut payload = [0u8; 16];
    payload[0] = subcommand;
    payload
}

/// Build a complete command frame.
///
/// `mac` is in wire order (reversed relative to its printed form) and
/// `count` is the already-incremented packet counter. The cleartext payload
/// checksum is written before the total checksum so the latter covers it.
pub fn build_command_packet(
    key: &[u8; 16],
    mac: &[u8; 6],
    id: &[u8; 4],
    count: u16,
    command: u8,
    payload: &[u8],
) -> Vec<u8> {
    let mut packet = vec![0u8; HEADER_LEN];
    packet[0x00..0x08].copy_from_slice(&MAGIC);
    packet[0x24] = 0x2a;
    packet[0x25] = 0x27;
    packet[0x26] = command;
    packet[0x28..0x2a].copy_from_slice(&count.to_le_bytes());
    packet[0x2a..0x30].copy_from_slice(mac);
    packet[0x30..0x34].copy_from_slice(id);
    packet[0x34..0x36].copy_from_slice(&checksum(payload).to_le_bytes());

    packet.extend_from_slice(&crypto::encrypt(key, payload));

    let total = checksum(&packet);
    packet[0x20..0x22].copy_from_slice(&total.to_le_bytes());
    packet
}

/// Build the 48-byte discovery frame broadcast to 255.255.255.255:80.
pub fn build_discovery_packet(timestamp: &TimestampBlock, local_ip: [u8; 4], local_port: u16) -> [u8; 0x30] {
    let mut packet = [0u8; 0x30];
    packet[0x08..0x14].copy_from_slice(&timestamp.encode());
    packet[0x18..0x1c].copy_from_slice(&local_ip);
    packet[0x1c..0x1e].copy_from_slice(&local_port.to_le_bytes());
    packet[0x26] = 0x06;

    let total = checksum(&packet);
    packet[0x20..0x22].copy_from_slice(&total.to_le_bytes());
    packet
}

/// What a device answered to a discovery broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryReply {
    /// The 16-bit device-type code.
    pub device_type: u16,
    /// MAC address in wire order.
    pub mac: [u8; 6],
}

/// Parse a discovery reply datagram. Undersized packets yield `None`.
pub fn parse_discovery_reply(packet: &[u8]) -> Option<DiscoveryReply> {
    if packet.len() < MIN_DISCOVERY_REPLY_LEN {
        return None;
    }
    let mut mac = [0u8; 6];
    mac.copy_from_slice(&packet[0x3a..0x40]);
    Some(DiscoveryReply {
        device_type: u16::from_le_bytes([packet[0x34], packet[0x35]]),
        mac,
    })
}

/// A decoded device response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceResponse {
    /// The device set its error field, or answered with a parameter we do
    /// not recognize. Not a transport failure; callers decide whether the
    /// absence of a result matters.
    Empty,
    /// Authentication grant carrying the session id and key.
    AuthGrant { id: [u8; 4], key: [u8; 16] },
    /// Command acknowledged.
    Ack,
    /// State readout: the raw value byte and its tenths companion.
    State { value: u8, tenths: u8 },
    /// A captured IR/RF code.
    Code(Vec<u8>),
    /// RF sweep poll: whether a frequency has been locked.
    RfFrequencyLocked(bool),
    /// RF code poll: whether a code is ready.
    RfCodeReady(bool),
}

/// Parse and decrypt a response frame.
///
/// A nonzero device error code (offsets 0x22-0x23) decodes to
/// [`DeviceResponse::Empty`] rather than an error. Responses shorter than
/// [`MIN_RESPONSE_LEN`] or carrying an unknown command byte fail.
pub fn parse_response(key: &[u8; 16], packet: &[u8]) -> Result<DeviceResponse> {
    if packet.len() < MIN_RESPONSE_LEN {
        return Err(CodecError::ResponseTooShort(packet.len()));
    }

    let error_code = u16::from_le_bytes([packet[0x22], packet[0x23]]);
    if error_code != 0 {
        return Ok(DeviceResponse::Empty);
    }

    let payload = crypto::decrypt(key, &packet[HEADER_LEN..])?;

    match packet[0x26] {
        CMD_AUTH_ACK => {
            if payload.len() < 0x14 {
                return Err(CodecError::TruncatedAuthGrant);
            }
            let mut id = [0u8; 4];
            id.copy_from_slice(&payload[0x00..0x04]);
            let mut session_key = [0u8; 16];
            session_key.copy_from_slice(&payload[0x04..0x14]);
            Ok(DeviceResponse::AuthGrant {
                id,
                key: session_key,
            })
        }
        CMD_DATA_ACK | CMD_DATA_ACK_ALT => Ok(decode_data_payload(&payload)),
        other => Err(CodecError::UnhandledCommand(other)),
    }
}

fn decode_data_payload(payload: &[u8]) -> DeviceResponse {
    match payload[0] {
        0x01 => DeviceResponse::State {
            value: payload[4],
            tenths: payload[5],
        },
        0x02 => DeviceResponse::Ack,
        0x04 => DeviceResponse::Code(payload[4..].to_vec()),
        0x1a => DeviceResponse::RfFrequencyLocked(payload[4] == 1),
        0x1b => DeviceResponse::RfCodeReady(payload[4] == 1),
        _ => DeviceResponse::Empty,
    }
}
