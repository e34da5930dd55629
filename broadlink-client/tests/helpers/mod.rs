//! A scripted loopback stand-in for a physical blaster or outlet.

#![allow(dead_code)]

use std::net::UdpSocket;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use broadlink_codec::{frame, INITIAL_KEY};

/// Session id the mock hands out during authentication.
pub const SESSION_ID: [u8; 4] = [0xaa, 0xbb, 0xcc, 0xdd];

/// Session key the mock hands out during authentication.
pub const SESSION_KEY: [u8; 16] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f,
];

/// MAC the mock claims, in wire order (printed: 11:22:33:44:55:66).
pub const DEVICE_MAC: [u8; 6] = [0x66, 0x55, 0x44, 0x33, 0x22, 0x11];

/// One decrypted request as the mock observed it.
pub struct SeenRequest {
    pub command: u8,
    pub counter: u16,
    pub mac: [u8; 6],
    pub payload: Vec<u8>,
    pub at: Instant,
}

impl SeenRequest {
    /// Subcommand byte of a basic request (0 for empty payloads).
    pub fn subcommand(&self) -> u8 {
        self.payload.first().copied().unwrap_or(0)
    }
}

/// How the mock answers data commands after granting authentication.
pub enum Script {
    /// Acknowledge everything.
    Acknowledge,
    /// Answer state queries with the given value byte.
    PowerState(u8),
    /// Report "nothing captured" for `polls` check-data requests, then hand
    /// over the code.
    LearnAfter { polls: usize, code: Vec<u8> },
    /// Never produce a captured code.
    NeverLearn,
    /// RF flow: report no frequency lock for `sweep_polls` checks, then
    /// lock, then hand over the code on the first check-data.
    RfLearn { sweep_polls: usize, code: Vec<u8> },
}

pub struct MockBlaster {
    pub port: u16,
    requests: Receiver<SeenRequest>,
}

impl MockBlaster {
    /// Spawn a factory-fresh mock that expects an authentication handshake.
    pub fn spawn(script: Script) -> Self {
        Self::spawn_with_key(script, INITIAL_KEY)
    }

    /// Spawn a mock that already shares a session key with its peer, the
    /// way a manually configured device does.
    pub fn spawn_with_key(script: Script, initial_key: [u8; 16]) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").expect("bind mock socket");
        socket
            .set_read_timeout(Some(Duration::from_secs(30)))
            .expect("set mock read timeout");
        let port = socket.local_addr().expect("mock local addr").port();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || serve(socket, initial_key, script, tx));
        Self { port, requests: rx }
    }

    /// Block for the next observed request.
    pub fn next_request(&self) -> SeenRequest {
        self.requests
            .recv_timeout(Duration::from_secs(5))
            .expect("no request arrived at the mock")
    }

    /// Everything observed so far, without blocking.
    pub fn drain(&self) -> Vec<SeenRequest> {
        self.requests.try_iter().collect()
    }
}

fn serve(socket: UdpSocket, mut key: [u8; 16], script: Script, tx: Sender<SeenRequest>) {
    let mut polls_left = match &script {
        Script::LearnAfter { polls, .. } => *polls,
        Script::RfLearn { sweep_polls, .. } => *sweep_polls,
        _ => 0,
    };
    let mut buf = [0u8; 2048];

    loop {
        let Ok((len, peer)) = socket.recv_from(&mut buf) else {
            return;
        };
        let packet = &buf[..len];
        if packet.len() < frame::HEADER_LEN {
            continue;
        }

        let command = packet[0x26];
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&packet[0x2a..0x30]);
        let payload =
            broadlink_codec::decrypt(&key, &packet[frame::HEADER_LEN..]).unwrap_or_default();
        let subcommand = payload.first().copied().unwrap_or(0);

        if tx
            .send(SeenRequest {
                command,
                counter: u16::from_le_bytes([packet[0x28], packet[0x29]]),
                mac,
                payload,
                at: Instant::now(),
            })
            .is_err()
        {
            return;
        }

        let response = match command {
            frame::CMD_AUTH => {
                let mut grant = [0u8; 0x14];
                grant[0x00..0x04].copy_from_slice(&SESSION_ID);
                grant[0x04..0x14].copy_from_slice(&SESSION_KEY);
                let packet = reply(&key, frame::CMD_AUTH_ACK, &grant);
                key = SESSION_KEY;
                Some(packet)
            }
            frame::CMD_DATA => data_response(&key, &script, &mut polls_left, subcommand),
            _ => None,
        };
        if let Some(packet) = response {
            let _ = socket.send_to(&packet, peer);
        }
    }
}

fn data_response(
    key: &[u8; 16],
    script: &Script,
    polls_left: &mut usize,
    subcommand: u8,
) -> Option<Vec<u8>> {
    match script {
        Script::Acknowledge => Some(reply(key, frame::CMD_DATA_ACK, &param(0x02))),
        Script::PowerState(value) => {
            let mut payload = param(0x01);
            payload[4] = *value;
            Some(reply(key, frame::CMD_DATA_ACK, &payload))
        }
        Script::LearnAfter { code, .. } => match subcommand {
            frame::SUB_CHECK_DATA => {
                if *polls_left > 0 {
                    *polls_left -= 1;
                    Some(reply(key, frame::CMD_DATA_ACK, &param(0x00)))
                } else {
                    let mut payload = vec![0x04, 0, 0, 0];
                    payload.extend_from_slice(code);
                    Some(reply(key, frame::CMD_DATA_ACK, &payload))
                }
            }
            frame::SUB_CANCEL_LEARNING => None,
            _ => Some(reply(key, frame::CMD_DATA_ACK, &param(0x02))),
        },
        Script::NeverLearn => match subcommand {
            frame::SUB_CANCEL_LEARNING => None,
            _ => Some(reply(key, frame::CMD_DATA_ACK, &param(0x00))),
        },
        Script::RfLearn { code, .. } => match subcommand {
            frame::SUB_RF_CHECK_FREQUENCY => {
                let mut payload = param(0x1a);
                if *polls_left > 0 {
                    *polls_left -= 1;
                } else {
                    payload[4] = 1;
                }
                Some(reply(key, frame::CMD_DATA_ACK, &payload))
            }
            frame::SUB_CHECK_DATA => {
                let mut payload = vec![0x04, 0, 0, 0];
                payload.extend_from_slice(code);
                Some(reply(key, frame::CMD_DATA_ACK, &payload))
            }
            frame::SUB_CANCEL_LEARNING => None,
            _ => Some(reply(key, frame::CMD_DATA_ACK, &param(0x02))),
        },
    }
}

fn param(subcommand: u8) -> [u8; 16] {
    let mut payload = [0u8; 16];
    payload[0] = subcommand;
    payload
}

fn reply(key: &[u8; 16], command: u8, payload: &[u8]) -> Vec<u8> {
    frame::build_command_packet(key, &DEVICE_MAC, &SESSION_ID, 1, command, payload)
}
