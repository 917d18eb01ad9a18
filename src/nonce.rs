//! Nonce derivation and the monotonic timestamp authority
//!
//! The 96-bit nonce is the envelope timestamp itself: big-endian seconds
//! (8 bytes) followed by big-endian microseconds (4 bytes). Packing is pure;
//! uniqueness comes from never issuing the same `(sec, usec)` pair twice,
//! which is the job of `NonceIssuer`.

use tracing::debug;

use crate::clock::{ClockSource, Timestamp};
use crate::errors::{Result, XaalError};

/// Nonce length for the IETF ChaCha20-Poly1305 variant
pub const NONCE_SIZE: usize = 12;

/// 96-bit AEAD nonce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nonce([u8; NONCE_SIZE]);

impl Nonce {
    /// Pack `sec || usec` big-endian
    pub fn derive(sec: u64, usec: u32) -> Self {
        let mut buf = [0u8; NONCE_SIZE];
        buf[..8].copy_from_slice(&sec.to_be_bytes());
        buf[8..].copy_from_slice(&usec.to_be_bytes());
        Self(buf)
    }

    pub fn from_timestamp(ts: Timestamp) -> Self {
        Self::derive(ts.sec, ts.usec)
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

impl From<[u8; NONCE_SIZE]> for Nonce {
    fn from(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }
}

/// Single issuing authority for envelope timestamps under one key
///
/// Every issued timestamp is strictly greater than the previous one. When the
/// clock stalls, repeats or steps backwards (NTP resync, microsecond counter
/// wrap) the issuer hands out the successor of the last value instead, so the
/// wire format stays `(sec, usec)` while nonces never repeat.
#[derive(Debug, Default)]
pub struct NonceIssuer {
    last: Option<Timestamp>,
}

impl NonceIssuer {
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Last timestamp handed out, if any
    pub fn last_issued(&self) -> Option<Timestamp> {
        self.last
    }

    /// Issue a fresh timestamp from `clock`
    ///
    /// # Errors
    /// `NonceExhausted` once `(u64::MAX, u32::MAX)` has been issued.
    pub fn issue<C: ClockSource + ?Sized>(&mut self, clock: &C) -> Result<Timestamp> {
        let observed = clock.now();
        let issued = match self.last {
            Some(last) if observed <= last => {
                let next = last.successor().ok_or(XaalError::NonceExhausted)?;
                debug!(
                    observed_sec = observed.sec,
                    observed_usec = observed.usec,
                    issued_sec = next.sec,
                    issued_usec = next.usec,
                    "clock did not advance, bumping timestamp"
                );
                next
            }
            _ => observed,
        };
        self.last = Some(issued);
        Ok(issued)
    }
}
