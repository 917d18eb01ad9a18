//! AEAD engine - ChaCha20-Poly1305 (IETF, 96-bit nonce)
//!
//! Combined mode: the sealed blob is `ciphertext || tag`, ciphertext the
//! same length as the plaintext and the tag always 16 bytes. A fresh cipher
//! instance is built for every call so no keystream state outlives a message.

use std::fmt;
use std::str::FromStr;

use chacha20poly1305::aead::{Aead, AeadInPlace, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce as CipherNonce};
use serde::de::{self, Deserialize, Deserializer};

use crate::errors::{Result, XaalError};
use crate::nonce::Nonce;
use crate::AEAD_TAG_SIZE;

/// Associated data for every xAAL payload: CBOR empty list
pub const EMPTY_LIST_AAD: [u8; 1] = [0x80];

/// 256-bit pre-shared key
#[derive(Clone, PartialEq, Eq)]
pub struct Key256([u8; 32]);

impl Key256 {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.0))
    }
}

impl fmt::Debug for Key256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Key256(<redacted>)")
    }
}

impl FromStr for Key256 {
    type Err = XaalError;

    /// Parse 64 hex characters
    fn from_str(s: &str) -> Result<Self> {
        let raw = hex::decode(s.trim()).map_err(|e| XaalError::Config(format!("key is not hex: {}", e)))?;
        let bytes: [u8; 32] = raw
            .try_into()
            .map_err(|raw: Vec<u8>| XaalError::Config(format!("key must be 32 bytes, got {}", raw.len())))?;
        Ok(Self(bytes))
    }
}

impl<'de> Deserialize<'de> for Key256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Encrypt and authenticate, returning ciphertext and detached tag
pub fn seal(
    key: &Key256,
    nonce: &Nonce,
    aad: &[u8],
    plaintext: &[u8],
) -> Result<(Vec<u8>, [u8; AEAD_TAG_SIZE])> {
    let mut buffer = plaintext.to_vec();
    let tag = key
        .cipher()
        .encrypt_in_place_detached(CipherNonce::from_slice(nonce.as_bytes()), aad, &mut buffer)
        .map_err(|_| XaalError::Encode("plaintext exceeds ChaCha20 block counter".to_string()))?;
    let mut detached = [0u8; AEAD_TAG_SIZE];
    detached.copy_from_slice(tag.as_slice());
    Ok((buffer, detached))
}

/// Seal an xAAL payload: empty-list AAD, combined `ciphertext || tag` output
pub fn seal_payload(key: &Key256, nonce: &Nonce, plaintext: &[u8]) -> Result<Vec<u8>> {
    key.cipher()
        .encrypt(
            CipherNonce::from_slice(nonce.as_bytes()),
            Payload {
                msg: plaintext,
                aad: &EMPTY_LIST_AAD,
            },
        )
        .map_err(|_| XaalError::Encode("plaintext exceeds ChaCha20 block counter".to_string()))
}

/// Verify and decrypt a combined `ciphertext || tag` blob
pub fn open(key: &Key256, nonce: &Nonce, aad: &[u8], sealed: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < AEAD_TAG_SIZE {
        return Err(XaalError::Decode(format!(
            "sealed payload shorter than tag: {} bytes",
            sealed.len()
        )));
    }
    key.cipher()
        .decrypt(CipherNonce::from_slice(nonce.as_bytes()), Payload { msg: sealed, aad })
        .map_err(|_| XaalError::AuthenticationFailed)
}

/// Open an xAAL payload sealed with `seal_payload`
pub fn open_payload(key: &Key256, nonce: &Nonce, sealed: &[u8]) -> Result<Vec<u8>> {
    open(key, nonce, &EMPTY_LIST_AAD, sealed)
}
