//! Transmitter - the secure send pipeline
//!
//! Encodes a `Message`, takes a fresh timestamp from the nonce authority,
//! seals the payload under the pre-shared key, wraps it in an envelope and
//! hands the datagram to the `Publisher`. Every call starts from a fresh
//! clock read; an envelope is never resent.

use tracing::info;
use uuid::Uuid;

use crate::aead::{self, Key256};
use crate::clock::{ClockSource, Timestamp};
use crate::envelope::EnvelopeCodec;
use crate::errors::Result;
use crate::message::Message;
use crate::nonce::{Nonce, NonceIssuer};
use crate::payload::PayloadCodec;
use crate::publisher::{LinkStatus, Publisher, Transport};
use crate::scheduler::MessageSink;
use crate::XAAL_VERSION;

/// A finished datagram and the timestamp its nonce was derived from
#[derive(Debug, Clone, PartialEq)]
pub struct SealedDatagram {
    pub timestamp: Timestamp,
    pub bytes: Vec<u8>,
}

/// Seal `msg` at a caller-chosen timestamp
///
/// Pure: same inputs, same bytes. The caller owns nonce uniqueness, so
/// outside of tests go through `Transmitter`, which draws `timestamp` from
/// its `NonceIssuer`.
pub fn seal_message(key: &Key256, timestamp: Timestamp, targets: &[Uuid], msg: &Message) -> Result<Vec<u8>> {
    let payload = PayloadCodec::encode(msg)?;
    seal_encoded(key, timestamp, targets, &payload)
}

fn seal_encoded(key: &Key256, timestamp: Timestamp, targets: &[Uuid], payload: &[u8]) -> Result<Vec<u8>> {
    let nonce = Nonce::from_timestamp(timestamp);
    let sealed = aead::seal_payload(key, &nonce, payload)?;
    EnvelopeCodec::encode(XAAL_VERSION, timestamp, targets, &sealed)
}

/// Transmitter - owns the key, the clock and the single nonce authority
pub struct Transmitter<C, T, L> {
    key: Key256,
    clock: C,
    issuer: NonceIssuer,
    publisher: Publisher<T, L>,
}

impl<C, T, L> Transmitter<C, T, L>
where
    C: ClockSource,
    T: Transport,
    L: LinkStatus,
{
    pub fn new(key: Key256, clock: C, publisher: Publisher<T, L>) -> Self {
        Self {
            key,
            clock,
            issuer: NonceIssuer::new(),
            publisher,
        }
    }

    /// Build the datagram for `msg` under a freshly issued timestamp
    ///
    /// The payload is encoded before a timestamp is drawn, so an
    /// unencodable message does not burn a nonce.
    pub fn prepare(&mut self, msg: &Message) -> Result<SealedDatagram> {
        let payload = PayloadCodec::encode(msg)?;
        let timestamp = self.issuer.issue(&self.clock)?;
        let bytes = seal_encoded(&self.key, timestamp, &[], &payload)?;
        Ok(SealedDatagram { timestamp, bytes })
    }

    /// Prepare and publish `msg`
    pub fn send(&mut self, msg: &Message) -> Result<usize> {
        let datagram = self.prepare(msg)?;
        let sent = self.publisher.send(&datagram.bytes)?;
        info!(
            kind = %msg.kind(),
            action = msg.action(),
            sec = datagram.timestamp.sec,
            usec = datagram.timestamp.usec,
            bytes = sent,
            "sent message"
        );
        Ok(sent)
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn publisher(&self) -> &Publisher<T, L> {
        &self.publisher
    }

    pub fn last_issued(&self) -> Option<Timestamp> {
        self.issuer.last_issued()
    }
}

impl<C, T, L> MessageSink for Transmitter<C, T, L>
where
    C: ClockSource,
    T: Transport,
    L: LinkStatus,
{
    fn dispatch(&mut self, msg: &Message) -> Result<()> {
        self.send(msg).map(|_| ())
    }
}
