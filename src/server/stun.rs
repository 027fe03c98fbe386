//! STUN responder for WebRTC connectivity on the local network.
//!
//! Implements just enough of RFC 5389 for browser ICE agents: binding
//! requests are answered with the sender's address in an XOR-MAPPED-ADDRESS
//! attribute. Anything else arriving on the port - truncated datagrams,
//! other message types, non-STUN traffic - is dropped without a reply, so
//! the responder never amplifies stray packets.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::{debug, error, info};

/// Default STUN port (RFC 5389)
pub const DEFAULT_STUN_PORT: u16 = 3478;

/// Magic cookie at bytes 4..8 of every RFC 5389 message.
pub const MAGIC_COOKIE: u32 = 0x2112_A442;

/// Message type of a binding request.
pub const BINDING_REQUEST: u16 = 0x0001;
/// Message type of a binding success response.
pub const BINDING_SUCCESS: u16 = 0x0101;
/// Attribute type of XOR-MAPPED-ADDRESS.
pub const ATTR_XOR_MAPPED_ADDRESS: u16 = 0x0020;

/// Fixed STUN header length.
const HEADER_LEN: usize = 20;
/// Address family code for IPv4 inside a mapped-address attribute.
const FAMILY_IPV4: u8 = 0x01;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("datagram shorter than the 20-byte STUN header")]
    Truncated,
    #[error("unsupported message type {0:#06x}")]
    UnsupportedType(u16),
    #[error("bad magic cookie {0:#010x}")]
    BadMagic(u32),
}

/// A decoded binding request.
///
/// Only the header matters to this responder: the message length field is
/// ignored and request attributes are never parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingRequest {
    pub transaction_id: [u8; 12],
}

impl BindingRequest {
    /// Decode the header of a binding request from a raw datagram.
    pub fn decode(datagram: &[u8]) -> Result<Self, DecodeError> {
        if datagram.len() < HEADER_LEN {
            return Err(DecodeError::Truncated);
        }

        let mut buf = &datagram[..HEADER_LEN];
        let message_type = buf.get_u16();
        let _message_length = buf.get_u16();
        let magic = buf.get_u32();

        if message_type != BINDING_REQUEST {
            return Err(DecodeError::UnsupportedType(message_type));
        }
        if magic != MAGIC_COOKIE {
            return Err(DecodeError::BadMagic(magic));
        }

        let mut transaction_id = [0u8; 12];
        buf.copy_to_slice(&mut transaction_id);
        Ok(Self { transaction_id })
    }

    /// Encode the binding success response for this request as seen from
    /// `source`. Returns `None` for non-IPv4 sources, which get no reply.
    pub fn respond_to(&self, source: SocketAddr) -> Option<Vec<u8>> {
        let SocketAddr::V4(source) = source else {
            return None;
        };

        let xor_port = source.port() ^ (MAGIC_COOKIE >> 16) as u16;
        let xor_addr = u32::from(*source.ip()) ^ MAGIC_COOKIE;

        let mut buf = BytesMut::with_capacity(HEADER_LEN + 12);
        buf.put_u16(BINDING_SUCCESS);
        buf.put_u16(12); // one attribute: 4-byte header plus 8-byte value
        buf.put_u32(MAGIC_COOKIE);
        buf.put_slice(&self.transaction_id);
        buf.put_u16(ATTR_XOR_MAPPED_ADDRESS);
        buf.put_u16(8);
        buf.put_u8(0);
        buf.put_u8(FAMILY_IPV4);
        buf.put_u16(xor_port);
        buf.put_u32(xor_addr);
        Some(buf.to_vec())
    }
}

/// Handle one datagram: the bytes to send back, or `None` for silence.
pub fn respond(datagram: &[u8], source: SocketAddr) -> Option<Vec<u8>> {
    match BindingRequest::decode(datagram) {
        Ok(request) => request.respond_to(source),
        Err(e) => {
            debug!("ignoring datagram from {}: {}", source, e);
            None
        }
    }
}

/// STUN server handle for graceful shutdown
pub struct StunServerHandle {
    pub addr: SocketAddr,
    shutdown: Arc<tokio::sync::Notify>,
}

impl StunServerHandle {
    /// Signal the server to shut down
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}

/// Start a STUN server on the specified address
pub async fn start_stun_server(addr: SocketAddr) -> anyhow::Result<StunServerHandle> {
    let socket = UdpSocket::bind(addr).await?;
    let bound_addr = socket.local_addr()?;
    let shutdown = Arc::new(tokio::sync::Notify::new());
    let shutdown_clone = shutdown.clone();

    info!("STUN server listening on {}", bound_addr);

    tokio::spawn(async move {
        run_stun_server(socket, shutdown_clone).await;
    });

    Ok(StunServerHandle {
        addr: bound_addr,
        shutdown,
    })
}

async fn run_stun_server(socket: UdpSocket, shutdown: Arc<tokio::sync::Notify>) {
    let mut buf = vec![0u8; 1500]; // Standard MTU size

    loop {
        tokio::select! {
            result = socket.recv_from(&mut buf) => {
                match result {
                    Ok((len, src_addr)) => {
                        let Some(reply) = respond(&buf[..len], src_addr) else {
                            continue;
                        };
                        match socket.send_to(&reply, src_addr).await {
                            Ok(_) => debug!("binding response sent to {}", src_addr),
                            Err(e) => debug!("failed to answer {}: {}", src_addr, e),
                        }
                    }
                    Err(e) => {
                        error!("Error receiving UDP packet: {}", e);
                    }
                }
            }
            _ = shutdown.notified() => {
                info!("STUN server shutting down");
                break;
            }
        }
    }
}
