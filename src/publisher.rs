//! Publisher - best-effort datagram emission
//!
//! One envelope, one datagram. No acknowledgement, no retry, no
//! fragmentation. The link check happens before any I/O.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};

use tracing::debug;

use crate::errors::{Result, XaalError};
use crate::MAX_DATAGRAM_SIZE;

/// Datagram sink
pub trait Transport {
    /// Send one complete datagram, returning bytes written
    fn send_datagram(&self, bytes: &[u8]) -> std::io::Result<usize>;
}

/// Link-layer connectivity signal
pub trait LinkStatus {
    fn is_connected(&self) -> bool;
}

/// UDP socket with a fixed destination
///
/// Normally the xAAL multicast group; a unicast destination is accepted for
/// point-to-point diagnostics and loopback tests.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    destination: SocketAddr,
}

impl UdpTransport {
    /// Socket bound to an ephemeral port, sending to `group:port`
    pub fn multicast(group: Ipv4Addr, port: u16, ttl: u32) -> Result<Self> {
        let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))?;
        socket.set_multicast_ttl_v4(ttl)?;
        socket.set_multicast_loop_v4(true)?;
        Ok(Self {
            socket,
            destination: SocketAddr::V4(SocketAddrV4::new(group, port)),
        })
    }

    pub fn unicast(destination: SocketAddr) -> Result<Self> {
        let bind: SocketAddr = match destination {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (std::net::Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(bind)?;
        Ok(Self { socket, destination })
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }
}

impl Transport for UdpTransport {
    fn send_datagram(&self, bytes: &[u8]) -> std::io::Result<usize> {
        self.socket.send_to(bytes, self.destination)
    }
}

/// Publisher - link gate and size check in front of a `Transport`
pub struct Publisher<T, L> {
    transport: T,
    link: L,
}

impl<T: Transport, L: LinkStatus> Publisher<T, L> {
    pub fn new(transport: T, link: L) -> Self {
        Self { transport, link }
    }

    /// Transmit one datagram
    ///
    /// # Errors
    /// - `NotConnected` if the link is down; no I/O is attempted
    /// - `DatagramTooLarge` if `bytes` would need fragmentation
    /// - `Transport` if the OS send fails
    pub fn send(&self, bytes: &[u8]) -> Result<usize> {
        if !self.link.is_connected() {
            return Err(XaalError::NotConnected);
        }

        if bytes.len() > MAX_DATAGRAM_SIZE {
            return Err(XaalError::DatagramTooLarge {
                size: bytes.len(),
                max: MAX_DATAGRAM_SIZE,
            });
        }

        let sent = self.transport.send_datagram(bytes)?;
        debug!(bytes = sent, "datagram sent");
        Ok(sent)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn link(&self) -> &L {
        &self.link
    }
}
