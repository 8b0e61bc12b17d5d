//! Behringer X32 over OSC/UDP
//!
//! The desk listens on UDP 10023. Messages are plain OSC 1.0: a
//! null-terminated address padded to four bytes, a type tag string
//! (`,i` / `,f`) padded the same way, then big-endian arguments.

use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::{debug, info};

use super::MixingConsole;
use crate::error::{Error, Result};

/// Single OSC argument
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OscArg {
    Int(i32),
    Float(f32),
}

const PRIMARY_MIC: &[(&str, OscArg)] = &[
    ("/ch/01/mix/on", OscArg::Int(1)),
    ("/ch/01/mix/fader", OscArg::Float(0.687)),
    ("/ch/02/mix/on", OscArg::Int(1)),
    ("/ch/02/mix/fader", OscArg::Float(0.837)),
];

const AUX_INPUT: &[(&str, OscArg)] = &[
    ("/auxin/05/mix/on", OscArg::Int(1)),
    ("/auxin/05/mix/fader", OscArg::Float(0.75)),
];

fn pad_string(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
    while buf.len() % 4 != 0 {
        buf.push(0);
    }
}

/// Encode one OSC message with a single argument
pub fn encode_osc(address: &str, arg: OscArg) -> Vec<u8> {
    let mut buf = Vec::with_capacity(address.len() + 12);
    pad_string(&mut buf, address);
    match arg {
        OscArg::Int(v) => {
            pad_string(&mut buf, ",i");
            buf.extend_from_slice(&v.to_be_bytes());
        }
        OscArg::Float(v) => {
            pad_string(&mut buf, ",f");
            buf.extend_from_slice(&v.to_be_bytes());
        }
    }
    buf
}

pub struct X32Console {
    socket: UdpSocket,
    target: SocketAddr,
}

impl X32Console {
    /// Bind an ephemeral local port for sending to the desk at `address`
    pub async fn connect(address: &str) -> Result<Self> {
        let target: SocketAddr = address
            .parse()
            .map_err(|e| Error::Config(format!("invalid X32 address '{}': {}", address, e)))?;
        let local: SocketAddr = if target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(local).await?;
        info!("X32 console target {}", target);
        Ok(Self { socket, target })
    }

    async fn send_all(&self, messages: &[(&str, OscArg)]) -> Result<()> {
        for (address, arg) in messages {
            let packet = encode_osc(address, *arg);
            self.socket
                .send_to(&packet, self.target)
                .await
                .map_err(|e| Error::Console(format!("{} -> {}: {}", address, self.target, e)))?;
            debug!(address, ?arg, "OSC sent");
        }
        Ok(())
    }
}

#[async_trait]
impl MixingConsole for X32Console {
    async fn enable_primary_mic(&self) -> Result<()> {
        self.send_all(PRIMARY_MIC).await
    }

    async fn enable_aux_input(&self) -> Result<()> {
        self.send_all(AUX_INPUT).await
    }
}
