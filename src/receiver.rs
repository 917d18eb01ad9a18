use std::net::{SocketAddr, UdpSocket};

use crate::aead::{self, Key256};
use crate::envelope::{Envelope, EnvelopeCodec};
use crate::errors::{Result, XaalError};
use crate::message::Message;
use crate::nonce::Nonce;
use crate::payload::PayloadCodec;
use crate::XAAL_VERSION;

/// Authenticated, decrypted datagram
#[derive(Debug, Clone, PartialEq)]
pub struct Received {
    pub envelope: Envelope,
    pub message: Message,
}

pub struct Receiver;

impl Receiver {
    pub fn open(datagram: &[u8], key: &Key256) -> Result<Received> {
        let envelope = EnvelopeCodec::decode(datagram)?;
        if envelope.version != u64::from(XAAL_VERSION) {
            return Err(XaalError::UnsupportedVersion(envelope.version));
        }

        let nonce = Nonce::from_timestamp(envelope.timestamp);
        let payload = aead::open_payload(key, &nonce, &envelope.ciphertext)?;
        let message = PayloadCodec::decode(&payload)?;

        Ok(Received { envelope, message })
    }

    pub fn receive(socket: &UdpSocket, buffer: &mut [u8], key: &Key256) -> Result<(Received, SocketAddr)> {
        let (bytes_received, sender_addr) = socket.recv_from(buffer)?;
        let received = Self::open(&buffer[..bytes_received], key)?;
        Ok((received, sender_addr))
    }
}
