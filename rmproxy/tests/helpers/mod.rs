//! A scripted loopback stand-in for a physical device, shared by the
//! end-to-end proxy tests.

#![allow(dead_code)]

use std::net::UdpSocket;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use broadlink_codec::frame;

/// Session key the proxy-side manual device configuration carries.
pub const SESSION_KEY: [u8; 16] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f,
];
pub const SESSION_KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f";
pub const SESSION_ID: [u8; 4] = [0xaa, 0xbb, 0xcc, 0xdd];
pub const SESSION_ID_HEX: &str = "aabbccdd";

/// MAC in wire order (printed: 11:22:33:44:55:66).
pub const DEVICE_MAC: [u8; 6] = [0x66, 0x55, 0x44, 0x33, 0x22, 0x11];

pub struct SeenRequest {
    pub command: u8,
    pub payload: Vec<u8>,
    pub at: Instant,
}

pub enum Script {
    /// Acknowledge every data command.
    Acknowledge,
    /// Answer state queries with the given value byte.
    PowerState(u8),
}

/// A loopback device that already shares [`SESSION_KEY`] with the proxy,
/// the way a manually configured device does.
pub struct MockDevice {
    pub port: u16,
    requests: Receiver<SeenRequest>,
}

impl MockDevice {
    pub fn spawn(script: Script) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").expect("bind mock socket");
        socket
            .set_read_timeout(Some(Duration::from_secs(30)))
            .expect("set mock read timeout");
        let port = socket.local_addr().expect("mock local addr").port();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || serve(socket, script, tx));
        Self { port, requests: rx }
    }

    pub fn next_request(&self) -> SeenRequest {
        self.requests
            .recv_timeout(Duration::from_secs(5))
            .expect("no request arrived at the mock")
    }
}

fn serve(socket: UdpSocket, script: Script, tx: Sender<SeenRequest>) {
    let mut buf = [0u8; 2048];
    loop {
        let Ok((len, peer)) = socket.recv_from(&mut buf) else {
            return;
        };
        let packet = &buf[..len];
        if packet.len() < frame::HEADER_LEN {
            continue;
        }

        let payload = broadlink_codec::decrypt(&SESSION_KEY, &packet[frame::HEADER_LEN..])
            .unwrap_or_default();
        if tx
            .send(SeenRequest {
                command: packet[0x26],
                payload,
                at: Instant::now(),
            })
            .is_err()
        {
            return;
        }

        let response_payload = match &script {
            Script::Acknowledge => {
                let mut p = [0u8; 16];
                p[0] = 0x02;
                p
            }
            Script::PowerState(value) => {
                let mut p = [0u8; 16];
                p[0] = 0x01;
                p[4] = *value;
                p
            }
        };
        let response = frame::build_command_packet(
            &SESSION_KEY,
            &DEVICE_MAC,
            &SESSION_ID,
            1,
            frame::CMD_DATA_ACK,
            &response_payload,
        );
        let _ = socket.send_to(&response, peer);
    }
}
