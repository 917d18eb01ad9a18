//! Envelope codec - the outer xAAL wire structure
//!
//! Wire shape: `[version: uint, sec: uint, usec: uint, targets: bstr, payload: bstr]`.
//!
//! `targets` is itself CBOR: a list of 16-byte addresses, encoded and then
//! wrapped in a byte string. The broadcast case is therefore `h'80'`, i.e.
//! `0x41 0x80` on the wire. Receivers depend on this double encoding.

use serde::ser::{Serialize, SerializeTuple, Serializer};
use serde_bytes::{ByteBuf, Bytes};
use uuid::Uuid;

use crate::clock::Timestamp;
use crate::errors::{Result, XaalError};

/// Decoded envelope fields
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub version: u64,
    pub timestamp: Timestamp,
    pub targets: Vec<Uuid>,
    /// ChaCha20 ciphertext followed by the 16-byte Poly1305 tag
    pub ciphertext: Vec<u8>,
}

/// Envelope codec - stateless encode/decode of the outer structure
pub struct EnvelopeCodec;

impl EnvelopeCodec {
    /// Assemble the final datagram bytes
    pub fn encode(
        version: u8,
        timestamp: Timestamp,
        targets: &[Uuid],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        let targets = Self::encode_targets(targets)?;
        let wire = WireEnvelope {
            version,
            timestamp,
            targets: &targets,
            ciphertext,
        };
        serde_cbor::to_vec(&wire).map_err(|e| XaalError::Encode(e.to_string()))
    }

    /// Inner CBOR list of target addresses; `[0x80]` when empty
    pub fn encode_targets(targets: &[Uuid]) -> Result<Vec<u8>> {
        serde_cbor::to_vec(&WireTargets(targets)).map_err(|e| XaalError::Encode(e.to_string()))
    }

    pub fn decode_targets(bytes: &[u8]) -> Result<Vec<Uuid>> {
        let raw: Vec<ByteBuf> = serde_cbor::from_slice(bytes)?;
        raw.iter()
            .map(|addr| {
                Uuid::from_slice(addr).map_err(|_| {
                    XaalError::Decode(format!("target address must be 16 bytes, got {}", addr.len()))
                })
            })
            .collect()
    }

    /// Parse a datagram into its five envelope fields
    ///
    /// Does not check the version; that is the receiver's call.
    pub fn decode(bytes: &[u8]) -> Result<Envelope> {
        let (version, sec, usec, targets, ciphertext): (u64, u64, u32, ByteBuf, ByteBuf) =
            serde_cbor::from_slice(bytes)?;

        Ok(Envelope {
            version,
            timestamp: Timestamp::new(sec, usec),
            targets: Self::decode_targets(&targets)?,
            ciphertext: ciphertext.into_vec(),
        })
    }
}

struct WireTargets<'a>(&'a [Uuid]);

impl Serialize for WireTargets<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_tuple(self.0.len())?;
        for addr in self.0 {
            seq.serialize_element(Bytes::new(addr.as_bytes()))?;
        }
        seq.end()
    }
}

struct WireEnvelope<'a> {
    version: u8,
    timestamp: Timestamp,
    targets: &'a [u8],
    ciphertext: &'a [u8],
}

impl Serialize for WireEnvelope<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_tuple(5)?;
        seq.serialize_element(&self.version)?;
        seq.serialize_element(&self.timestamp.sec)?;
        seq.serialize_element(&self.timestamp.usec)?;
        seq.serialize_element(Bytes::new(self.targets))?;
        seq.serialize_element(Bytes::new(self.ciphertext))?;
        seq.end()
    }
}
