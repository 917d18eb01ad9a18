//! xAAL beacon core - periodic encrypted telemetry over UDP multicast
//!
//! Announces device presence and sensor readings on the local network using
//! the xAAL application protocol: a CBOR payload sealed with
//! ChaCha20-Poly1305 under a pre-shared key, wrapped in a CBOR envelope and
//! sent as a single multicast datagram.
//!
//! # Pipeline
//! `Scheduler` -> `Message` -> `PayloadCodec` -> `aead::seal` (nonce from
//! `NonceIssuer`, fed by a `ClockSource`) -> `EnvelopeCodec` -> `Publisher`.
//!
//! # Design Principles
//! - Nonces are strictly increasing `(sec, usec)` pairs for the process lifetime
//! - Key and nonce sizes are enforced by types, never checked at runtime
//! - Every send is fire-and-forget; failures are logged, never retried

pub mod errors;
pub mod clock;
pub mod nonce;
pub mod message;
pub mod payload;
pub mod envelope;
pub mod aead;
pub mod publisher;
pub mod link;
pub mod transmitter;
pub mod receiver;
pub mod sensor;
pub mod device;
pub mod scheduler;
pub mod config;

pub use aead::Key256;
pub use clock::{ClockSource, Timestamp};
pub use errors::{Result, XaalError};
pub use message::{Body, BodyValue, Message, MessageKind};
pub use nonce::{Nonce, NonceIssuer};

/// xAAL protocol version carried in every envelope
pub const XAAL_VERSION: u8 = 7;

/// xAAL multicast group
pub const MULTICAST_GROUP: std::net::Ipv4Addr = std::net::Ipv4Addr::new(224, 0, 29, 200);

/// Default xAAL bus port
pub const DEFAULT_PORT: u16 = 1236;

/// Largest datagram we will emit: an Ethernet-MTU IPv4/UDP payload, no fragmentation
pub const MAX_DATAGRAM_SIZE: usize = 1472;

/// Poly1305 tag length appended after the ciphertext
pub const AEAD_TAG_SIZE: usize = 16;
