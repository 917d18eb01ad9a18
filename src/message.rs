//! Application-level xAAL message
//!
//! A `Message` is built fresh for every send and never mutated after it is
//! handed to the transmitter.

use std::fmt;

use uuid::Uuid;

use crate::errors::XaalError;

/// xAAL message type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    Notify = 0,
    Request = 1,
    Reply = 2,
}

impl MessageKind {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u64> for MessageKind {
    type Error = XaalError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Notify),
            1 => Ok(Self::Request),
            2 => Ok(Self::Reply),
            other => Err(XaalError::Decode(format!("unknown message kind: {}", other))),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Notify => write!(f, "notify"),
            Self::Request => write!(f, "request"),
            Self::Reply => write!(f, "reply"),
        }
    }
}

/// Typed body value
#[derive(Debug, Clone, PartialEq)]
pub enum BodyValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<i64> for BodyValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for BodyValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<u32> for BodyValue {
    fn from(v: u32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for BodyValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<f32> for BodyValue {
    fn from(v: f32) -> Self {
        Self::Float(v.into())
    }
}

impl From<&str> for BodyValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for BodyValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Insertion-ordered string-keyed mapping
///
/// Keys are unique; inserting an existing key replaces its value in place.
/// An empty body is omitted from the encoded payload entirely.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Body {
    entries: Vec<(String, BodyValue)>,
}

impl Body {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<BodyValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&BodyValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BodyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// xAAL message: `[source, device_type, kind, action, body?]`
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    source: Uuid,
    device_type: String,
    kind: MessageKind,
    action: String,
    body: Body,
}

impl Message {
    pub fn new(
        source: Uuid,
        device_type: impl Into<String>,
        kind: MessageKind,
        action: impl Into<String>,
    ) -> Self {
        Self {
            source,
            device_type: device_type.into(),
            kind,
            action: action.into(),
            body: Body::new(),
        }
    }

    /// Builder-style body entry
    pub fn with(mut self, key: impl Into<String>, value: impl Into<BodyValue>) -> Self {
        self.body.insert(key, value);
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    pub fn source(&self) -> &Uuid {
        &self.source
    }

    pub fn device_type(&self) -> &str {
        &self.device_type
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn body(&self) -> &Body {
        &self.body
    }
}
