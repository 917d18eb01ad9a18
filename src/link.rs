//! Link-layer adapters
//!
//! Association itself (WiFi, DHCP) is the host's business. These adapters
//! only answer "can a datagram leave this host right now?".

use std::net::{IpAddr, Ipv4Addr, SocketAddrV4, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::publisher::LinkStatus;

/// Route probe towards the multicast group
///
/// Connecting a UDP socket sends nothing; it only asks the kernel for a
/// route and source address. No route means no usable link.
#[derive(Debug, Clone)]
pub struct InterfaceLink {
    group: Ipv4Addr,
    port: u16,
}

impl InterfaceLink {
    pub fn new(group: Ipv4Addr, port: u16) -> Self {
        Self { group, port }
    }

    /// Source address the kernel would use for the group, if any
    pub fn local_ip(&self) -> Option<Ipv4Addr> {
        let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)).ok()?;
        socket.connect(SocketAddrV4::new(self.group, self.port)).ok()?;
        match socket.local_addr().ok()?.ip() {
            IpAddr::V4(ip) if !ip.is_unspecified() => Some(ip),
            _ => None,
        }
    }
}

impl LinkStatus for InterfaceLink {
    fn is_connected(&self) -> bool {
        self.local_ip().is_some()
    }
}

/// Externally driven link flag
#[derive(Debug, Default)]
pub struct StaticLink {
    connected: AtomicBool,
}

impl StaticLink {
    pub fn new(connected: bool) -> Self {
        Self {
            connected: AtomicBool::new(connected),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

impl LinkStatus for StaticLink {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl<L: LinkStatus + ?Sized> LinkStatus for Arc<L> {
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}
