//! Payload codec - canonical CBOR encoding of the inner message
//!
//! Wire shape: `[source: bstr(16), device_type: tstr, kind: uint, action: tstr, body: map?]`.
//! The body element is omitted when empty. Definite lengths and minimal
//! integer widths only, so one `Message` always yields the same bytes.

use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeTuple, Serializer};
use serde_bytes::{ByteBuf, Bytes};
use uuid::Uuid;

use crate::errors::{Result, XaalError};
use crate::message::{Body, BodyValue, Message, MessageKind};

/// Payload codec - stateless encode/decode of `Message`
pub struct PayloadCodec;

impl PayloadCodec {
    /// Serialize a `Message` to its canonical CBOR form
    ///
    /// # Errors
    /// `Encode` if a body value has no wire representation (non-finite
    /// floats are refused rather than published).
    pub fn encode(msg: &Message) -> Result<Vec<u8>> {
        for (key, value) in msg.body().iter() {
            if let BodyValue::Float(f) = value {
                if !f.is_finite() {
                    return Err(XaalError::Encode(format!(
                        "body value for {:?} is not a finite number: {}",
                        key, f
                    )));
                }
            }
        }

        serde_cbor::to_vec(&WirePayload(msg)).map_err(|e| XaalError::Encode(e.to_string()))
    }

    /// Parse a decrypted payload back into a `Message`
    pub fn decode(bytes: &[u8]) -> Result<Message> {
        let decoded: DecodedPayload = serde_cbor::from_slice(bytes)?;
        Ok(decoded.0)
    }
}

impl Serialize for BodyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Int(v) => serializer.serialize_i64(*v),
            Self::Float(v) => serializer.serialize_f64(*v),
            Self::Text(v) => serializer.serialize_str(v),
        }
    }
}

impl Serialize for Body {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct WirePayload<'a>(&'a Message);

impl Serialize for WirePayload<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let msg = self.0;
        let len = if msg.body().is_empty() { 4 } else { 5 };

        let mut seq = serializer.serialize_tuple(len)?;
        seq.serialize_element(Bytes::new(msg.source().as_bytes()))?;
        seq.serialize_element(msg.device_type())?;
        seq.serialize_element(&msg.kind().as_u8())?;
        seq.serialize_element(msg.action())?;
        if !msg.body().is_empty() {
            seq.serialize_element(msg.body())?;
        }
        seq.end()
    }
}

struct BodyValueVisitor;

impl<'de> Visitor<'de> for BodyValueVisitor {
    type Value = BodyValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an integer, float or text body value")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<BodyValue, E> {
        Ok(BodyValue::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<BodyValue, E> {
        i64::try_from(v)
            .map(BodyValue::Int)
            .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<BodyValue, E> {
        Ok(BodyValue::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<BodyValue, E> {
        Ok(BodyValue::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<BodyValue, E> {
        Ok(BodyValue::Text(v))
    }
}

impl<'de> Deserialize<'de> for BodyValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(BodyValueVisitor)
    }
}

struct BodyVisitor;

impl<'de> Visitor<'de> for BodyVisitor {
    type Value = Body;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of text keys to body values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Body, A::Error> {
        let mut body = Body::new();
        while let Some(key) = map.next_key::<String>()? {
            if body.get(&key).is_some() {
                return Err(de::Error::custom(format!("duplicate body key: {}", key)));
            }
            let value: BodyValue = map.next_value()?;
            body.insert(key, value);
        }
        Ok(body)
    }
}

impl<'de> Deserialize<'de> for Body {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(BodyVisitor)
    }
}

struct DecodedPayload(Message);

struct PayloadVisitor;

impl<'de> Visitor<'de> for PayloadVisitor {
    type Value = DecodedPayload;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a 4 or 5 element xAAL payload array")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<DecodedPayload, A::Error> {
        let source: ByteBuf = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let source = Uuid::from_slice(&source)
            .map_err(|_| de::Error::invalid_length(source.len(), &"a 16 byte source address"))?;

        let device_type: String = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;

        let kind: u64 = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(2, &self))?;
        let kind = MessageKind::try_from(kind).map_err(de::Error::custom)?;

        let action: String = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(3, &self))?;

        let body: Option<Body> = seq.next_element()?;

        let msg = Message::new(source, device_type, kind, action).with_body(body.unwrap_or_default());
        Ok(DecodedPayload(msg))
    }
}

impl<'de> Deserialize<'de> for DecodedPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_seq(PayloadVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> Uuid {
        Uuid::parse_str("00112233445566778899aabbccddeeff").unwrap()
    }

    fn alive() -> Message {
        Message::new(source(), "Balance.basic", MessageKind::Notify, "alive").with("timeout", 600)
    }

    #[test]
    fn test_alive_golden_bytes() {
        let bytes = PayloadCodec::encode(&alive()).unwrap();
        assert_eq!(
            hex::encode(&bytes),
            "855000112233445566778899aabbccddeeff6d42616c616e63652e62617369630065616c697665a16774696d656f7574190258"
        );
    }

    #[test]
    fn test_alive_structure() {
        let bytes = PayloadCodec::encode(&alive()).unwrap();
        let value: serde_cbor::Value = serde_cbor::from_slice(&bytes).unwrap();

        let items = match value {
            serde_cbor::Value::Array(items) => items,
            other => panic!("expected array, got {:?}", other),
        };
        assert_eq!(items.len(), 5);
        assert_eq!(items[2], serde_cbor::Value::Integer(0));
        match &items[4] {
            serde_cbor::Value::Map(map) => {
                let timeout = map.get(&serde_cbor::Value::Text("timeout".into()));
                assert_eq!(timeout, Some(&serde_cbor::Value::Integer(600)));
            }
            other => panic!("expected map, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_body_is_omitted() {
        let msg = Message::new(source(), "Balance.basic", MessageKind::Request, "get_attributes");
        let bytes = PayloadCodec::encode(&msg).unwrap();

        assert_eq!(bytes[0], 0x84);
        assert_eq!(PayloadCodec::decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_round_trip_mixed_body() {
        let msg = Message::new(source(), "Balance.basic", MessageKind::Reply, "get_description")
            .with("vendor_id", "Rust")
            .with("offset", -42)
            .with("Weight", 12.25);

        let bytes = PayloadCodec::encode(&msg).unwrap();
        assert_eq!(PayloadCodec::decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let msg = alive().with("Weight", 3.5).with("info", "10.0.0.7");
        let first = PayloadCodec::encode(&msg).unwrap();
        for _ in 0..100 {
            assert_eq!(PayloadCodec::encode(&msg).unwrap(), first);
        }
    }

    #[test]
    fn test_non_finite_float_is_rejected() {
        let msg = alive().with("Weight", f64::NAN);
        assert!(matches!(PayloadCodec::encode(&msg), Err(XaalError::Encode(_))));
    }

    #[test]
    fn test_decode_rejects_short_source() {
        // [h'0011', "x", 0, "alive"]
        let bytes = hex::decode("8442001161780065616c697665").unwrap();
        assert!(matches!(PayloadCodec::decode(&bytes), Err(XaalError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_unknown_kind() {
        let mut bytes = PayloadCodec::encode(&alive()).unwrap();
        // kind sits right after the 2+16 byte source and 1+13 byte device type
        assert_eq!(bytes[32], 0x00);
        bytes[32] = 0x09;
        assert!(PayloadCodec::decode(&bytes).is_err());
    }
}
