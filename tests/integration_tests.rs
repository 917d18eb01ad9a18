use std::cell::RefCell;
use std::collections::HashSet;
use std::net::UdpSocket;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use uuid::Uuid;

use xaal_beacon::clock::{ManualClock, Timestamp};
use xaal_beacon::device::{DeviceIdentity, DEFAULT_ALIVE_TIMEOUT_SECS};
use xaal_beacon::envelope::EnvelopeCodec;
use xaal_beacon::link::StaticLink;
use xaal_beacon::payload::PayloadCodec;
use xaal_beacon::publisher::{Publisher, Transport, UdpTransport};
use xaal_beacon::receiver::Receiver;
use xaal_beacon::scheduler::{Intervals, ScheduleState, Scheduler};
use xaal_beacon::sensor::SimulatedLoadCell;
use xaal_beacon::transmitter::Transmitter;
use xaal_beacon::{BodyValue, Key256, Message, MessageKind, Nonce, XaalError};

const SCENARIO_SOURCE: &str = "00112233445566778899aabbccddeeff";

fn test_key() -> Key256 {
    let mut bytes = [0u8; 32];
    for (i, b) in bytes.iter_mut().enumerate() {
        *b = i as u8;
    }
    Key256::new(bytes)
}

fn identity() -> DeviceIdentity {
    DeviceIdentity {
        address: Uuid::parse_str(SCENARIO_SOURCE).unwrap(),
        device_type: "Balance.basic".into(),
        vendor_id: "Rust".into(),
        product_id: "xaal-beacon".into(),
        alive_timeout_secs: DEFAULT_ALIVE_TIMEOUT_SECS,
    }
}

/// In-memory transport shared between the transmitter and the test
#[derive(Clone, Default)]
struct CaptureTransport(Rc<RefCell<Vec<Vec<u8>>>>);

impl Transport for CaptureTransport {
    fn send_datagram(&self, bytes: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().push(bytes.to_vec());
        Ok(bytes.len())
    }
}

#[test]
fn test_scenario_alive_end_to_end() {
    let clock = ManualClock::new(1_700_000_000, 123_456);
    let capture = CaptureTransport::default();
    let publisher = Publisher::new(capture.clone(), StaticLink::new(true));
    let mut tx = Transmitter::new(test_key(), clock, publisher);

    tx.send(&identity().alive()).unwrap();

    let sent = capture.0.borrow();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        hex::encode(&sent[0]),
        "85071a6553f1001a0001e24041805843fb44395f42431798f77e63729f8d5c0241f04c14cba541cd681c6427e08058477c6e70588f93c2c1a738d027873bea4be19ea8b9c48a6cc547b470defece909b942d97"
    );

    let received = Receiver::open(&sent[0], &test_key()).unwrap();
    assert_eq!(received.message.kind(), MessageKind::Notify);
    assert_eq!(received.message.body().get("timeout"), Some(&BodyValue::Int(600)));
}

#[test]
fn test_envelope_structure_invariant() {
    let publisher = Publisher::new(CaptureTransport::default(), StaticLink::new(true));
    let capture = publisher.transport().clone();
    let mut tx = Transmitter::new(test_key(), ManualClock::new(1_000, 1), publisher);

    tx.send(&identity().alive()).unwrap();
    tx.send(&identity().description(Some("10.0.0.7"))).unwrap();
    tx.send(&identity().attributes_change(1.5)).unwrap();

    for datagram in capture.0.borrow().iter() {
        let value: serde_cbor::Value = serde_cbor::from_slice(datagram).unwrap();
        let items = match value {
            serde_cbor::Value::Array(items) => items,
            other => panic!("envelope is not an array: {:?}", other),
        };
        assert_eq!(items.len(), 5);
        assert_eq!(items[0], serde_cbor::Value::Integer(7));
        assert!(matches!(items[1], serde_cbor::Value::Integer(_)));
        assert!(matches!(items[2], serde_cbor::Value::Integer(_)));

        match &items[3] {
            serde_cbor::Value::Bytes(targets) => {
                assert_eq!(targets.as_slice(), &[0x80]);
                assert!(EnvelopeCodec::decode_targets(targets).unwrap().is_empty());
            }
            other => panic!("targets is not a byte string: {:?}", other),
        }
        assert!(matches!(items[4], serde_cbor::Value::Bytes(_)));
    }
}

#[test]
fn test_loopback_udp_pipeline() {
    let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
    receiver.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

    let transport = UdpTransport::unicast(receiver.local_addr().unwrap()).unwrap();
    let publisher = Publisher::new(transport, StaticLink::new(true));
    let mut tx = Transmitter::new(test_key(), ManualClock::new(1_700_000_000, 0), publisher);

    let msg = identity().attributes_change(12.34);
    tx.send(&msg).unwrap();

    let mut buf = [0u8; xaal_beacon::MAX_DATAGRAM_SIZE];
    let (received, _) = Receiver::receive(&receiver, &mut buf, &test_key()).unwrap();
    assert_eq!(received.message, msg);
    assert_eq!(received.envelope.timestamp, Timestamp::new(1_700_000_000, 0));
}

#[test]
fn test_scheduler_simulation_cadence() {
    let clock = Arc::new(ManualClock::new(0, 0));
    let capture = CaptureTransport::default();
    let publisher = Publisher::new(capture.clone(), StaticLink::new(true));
    let mut tx = Transmitter::new(test_key(), Arc::clone(&clock), publisher);
    let scheduler = Scheduler::new(identity(), Intervals::default());
    let mut sensor = SimulatedLoadCell::new(2450.0, 2.0, 0.0).unwrap();

    let mut state = ScheduleState::default();
    let mut presence_at = Vec::new();
    let mut status_at = Vec::new();

    for t in 0..=700u64 {
        clock.set(t, (t as u32) * 1_000);
        let before = capture.0.borrow().len();
        state = scheduler.tick(state, t, Some("127.0.0.1"), &mut tx, &mut sensor);

        for datagram in &capture.0.borrow()[before..] {
            let received = Receiver::open(datagram, &test_key()).unwrap();
            match received.message.action() {
                "alive" => presence_at.push(t),
                "attributes_change" => status_at.push(t),
                "get_description" => {}
                other => panic!("unexpected action {}", other),
            }
        }
    }

    assert_eq!(presence_at, vec![0, 301, 602]);
    assert_eq!(status_at.first(), Some(&0));
    assert!(status_at.windows(2).all(|w| w[1] - w[0] == 2));
    assert_eq!(status_at.len(), 351);
}

#[test]
fn test_presence_pair_is_back_to_back() {
    let capture = CaptureTransport::default();
    let publisher = Publisher::new(capture.clone(), StaticLink::new(true));
    let mut tx = Transmitter::new(test_key(), ManualClock::new(50, 0), publisher);
    let scheduler = Scheduler::new(identity(), Intervals::default());
    let mut sensor = SimulatedLoadCell::new(2450.0, 0.0, 0.0).unwrap();

    scheduler.tick(ScheduleState::default(), 50, None, &mut tx, &mut sensor);

    let actions: Vec<String> = capture
        .0
        .borrow()
        .iter()
        .map(|d| Receiver::open(d, &test_key()).unwrap().message.action().to_string())
        .collect();
    assert_eq!(actions, vec!["alive", "get_description", "attributes_change"]);
}

#[test]
fn test_disconnected_link_sends_nothing_but_advances_schedule() {
    let link = Arc::new(StaticLink::new(false));
    let capture = CaptureTransport::default();
    let publisher = Publisher::new(capture.clone(), Arc::clone(&link));
    let mut tx = Transmitter::new(test_key(), ManualClock::new(10, 0), publisher);
    let scheduler = Scheduler::new(identity(), Intervals::default());
    let mut sensor = SimulatedLoadCell::new(2450.0, 0.0, 0.0).unwrap();

    let state = scheduler.tick(ScheduleState::default(), 10, None, &mut tx, &mut sensor);
    assert!(capture.0.borrow().is_empty());
    assert_eq!(state.last_presence_sent, Some(10));
    assert_eq!(state.last_status_sent, Some(10));

    link.set_connected(true);
    let state = scheduler.tick(state, 12, None, &mut tx, &mut sensor);
    assert_eq!(capture.0.borrow().len(), 1);
    assert_eq!(state.last_status_sent, Some(12));
}

#[test]
fn test_nonces_unique_across_clock_resync() {
    let clock = Arc::new(ManualClock::new(2_000, 500));
    let capture = CaptureTransport::default();
    let publisher = Publisher::new(capture.clone(), StaticLink::new(true));
    let mut tx = Transmitter::new(test_key(), Arc::clone(&clock), publisher);
    let msg = identity().alive();

    for _ in 0..50 {
        tx.send(&msg).unwrap();
    }
    // resync steps the wall clock back and the microsecond counter wraps
    clock.set(1_990, 0);
    for _ in 0..50 {
        tx.send(&msg).unwrap();
    }

    let mut seen = HashSet::new();
    for datagram in capture.0.borrow().iter() {
        let env = EnvelopeCodec::decode(datagram).unwrap();
        assert!(seen.insert(Nonce::from_timestamp(env.timestamp)), "nonce reused");
    }
    assert_eq!(seen.len(), 100);
}

#[test]
fn test_payload_determinism() {
    let msg = identity().description(Some("192.168.0.42"));
    let first = PayloadCodec::encode(&msg).unwrap();
    for idx in 0..100 {
        assert_eq!(PayloadCodec::encode(&msg).unwrap(), first, "encoding {} differs", idx);
    }
}

#[test]
fn test_nan_reading_is_dropped_not_sent() {
    let capture = CaptureTransport::default();
    let publisher = Publisher::new(capture.clone(), StaticLink::new(true));
    let mut tx = Transmitter::new(test_key(), ManualClock::new(1, 0), publisher);

    let result = tx.send(&identity().attributes_change(f64::NAN));
    assert!(matches!(result, Err(XaalError::Encode(_))));
    assert!(capture.0.borrow().is_empty());
}

fn body_value() -> impl Strategy<Value = BodyValue> {
    prop_oneof![
        any::<i64>().prop_map(BodyValue::Int),
        (-1.0e9f64..1.0e9f64).prop_map(BodyValue::Float),
        "[ -~]{0,24}".prop_map(BodyValue::Text),
    ]
}

fn message() -> impl Strategy<Value = Message> {
    let kind = prop_oneof![
        Just(MessageKind::Notify),
        Just(MessageKind::Request),
        Just(MessageKind::Reply),
    ];
    (
        any::<[u8; 16]>(),
        "[a-z]{1,10}\\.[a-z]{1,10}",
        kind,
        "[a-z_]{1,20}",
        proptest::collection::vec(("[A-Za-z_]{1,12}", body_value()), 0..6),
    )
        .prop_map(|(source, device_type, kind, action, entries)| {
            entries.into_iter().fold(
                Message::new(Uuid::from_bytes(source), device_type, kind, action),
                |msg, (k, v)| msg.with(k, v),
            )
        })
}

proptest! {
    #[test]
    fn prop_payload_round_trip(msg in message()) {
        let bytes = PayloadCodec::encode(&msg).unwrap();
        prop_assert_eq!(PayloadCodec::decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn prop_nonce_packing_is_injective(a in any::<(u64, u32)>(), b in any::<(u64, u32)>()) {
        prop_assume!(a != b);
        prop_assert_ne!(Nonce::derive(a.0, a.1), Nonce::derive(b.0, b.1));
    }

    #[test]
    fn prop_sealed_datagram_opens(msg in message(), sec in any::<u64>(), usec in any::<u32>()) {
        let bytes = xaal_beacon::transmitter::seal_message(&test_key(), Timestamp::new(sec, usec), &[], &msg).unwrap();
        let received = Receiver::open(&bytes, &test_key()).unwrap();
        prop_assert_eq!(received.envelope.timestamp, Timestamp::new(sec, usec));
        prop_assert_eq!(received.message, msg);
    }
}
