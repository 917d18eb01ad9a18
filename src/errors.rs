//! Error types for xAAL beacon operations
//!
//! Every error is local to one send attempt. None is fatal to the process
//! and none triggers a retry.
use std::io;

use thiserror::Error;

/// Result type alias for beacon operations
pub type Result<T> = std::result::Result<T, XaalError>;

/// Beacon error enumeration
///
/// Covers all failure modes in the send pipeline:
/// - Link-layer unavailability
/// - Payload / envelope serialization issues
/// - Network I/O failures
/// - Authentication failures on the receive path
#[derive(Debug, Clone, PartialEq, Error)]
pub enum XaalError {
    /// Link layer reports no connectivity; nothing was sent
    #[error("not connected: no network link")]
    NotConnected,

    /// An application value could not be serialized
    #[error("encode error: {0}")]
    Encode(String),

    /// Corrupted or incompatible CBOR structure
    #[error("decode error: {0}")]
    Decode(String),

    /// Datagram send/receive failed at the OS layer
    #[error("transport error: {0}")]
    Transport(String),

    /// Envelope does not fit in one datagram
    #[error("datagram too large: {size} bytes, max {max}")]
    DatagramTooLarge { size: usize, max: usize },

    /// Poly1305 tag did not verify
    #[error("authentication failed: ciphertext or tag tampered")]
    AuthenticationFailed,

    /// Envelope carries a protocol version we do not speak
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u64),

    /// No timestamp greater than the last issued one is left
    #[error("nonce space exhausted for this key")]
    NonceExhausted,

    /// Configuration bundle is missing or invalid
    #[error("config error: {0}")]
    Config(String),
}

impl From<io::Error> for XaalError {
    fn from(err: io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_cbor::Error> for XaalError {
    fn from(err: serde_cbor::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
