//! Scheduler - periodic presence and status emission
//!
//! Each tick evaluates two independent slots against the wall clock:
//! presence (`alive` + `get_description`, every 300s by default) and status
//! (`attributes_change`, every second by default). Presence is evaluated
//! first. State is an explicit value threaded through `tick`; nothing is
//! global.
//!
//! A due slot is consumed by the attempt: the slot timestamp advances even
//! when the send fails (link down, transport error, encode error). Failed
//! sends are logged and dropped; the next attempt happens on the next due
//! tick with a fresh nonce.

use tracing::{debug, warn};

use crate::device::DeviceIdentity;
use crate::errors::Result;
use crate::message::Message;
use crate::sensor::LoadCell;

pub const DEFAULT_PRESENCE_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_STATUS_INTERVAL_SECS: u64 = 1;

/// Anything that can take a built message and try to put it on the wire
pub trait MessageSink {
    fn dispatch(&mut self, msg: &Message) -> Result<()>;
}

/// Last send time per slot, in epoch seconds; `None` means never sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScheduleState {
    pub last_presence_sent: Option<u64>,
    pub last_status_sent: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intervals {
    pub presence_secs: u64,
    pub status_secs: u64,
}

impl Default for Intervals {
    fn default() -> Self {
        Self {
            presence_secs: DEFAULT_PRESENCE_INTERVAL_SECS,
            status_secs: DEFAULT_STATUS_INTERVAL_SECS,
        }
    }
}

/// Which slots fire on a given tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Due {
    pub presence: bool,
    pub status: bool,
}

/// Strictly more than `interval` seconds elapsed, or never sent.
/// A clock that stepped back behind `last` also counts as due.
fn slot_due(last: Option<u64>, now: u64, interval: u64) -> bool {
    match last {
        None => true,
        Some(last) if now < last => true,
        Some(last) => now - last > interval,
    }
}

pub struct Scheduler {
    identity: DeviceIdentity,
    intervals: Intervals,
}

impl Scheduler {
    pub fn new(identity: DeviceIdentity, intervals: Intervals) -> Self {
        Self { identity, intervals }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn due(&self, state: &ScheduleState, now: u64) -> Due {
        Due {
            presence: slot_due(state.last_presence_sent, now, self.intervals.presence_secs),
            status: slot_due(state.last_status_sent, now, self.intervals.status_secs),
        }
    }

    /// Run one tick at wall-clock `now`
    ///
    /// `info` is the local address reported in the description message.
    pub fn tick<S, L>(
        &self,
        state: ScheduleState,
        now: u64,
        info: Option<&str>,
        sink: &mut S,
        sensor: &mut L,
    ) -> ScheduleState
    where
        S: MessageSink,
        L: LoadCell,
    {
        let due = self.due(&state, now);
        let mut next = state;

        if due.presence {
            deliver(sink, &self.identity.alive());
            deliver(sink, &self.identity.description(info));
            next.last_presence_sent = Some(now);
        }

        if due.status {
            let weight = sensor.read_units();
            debug!(weight, "load cell reading");
            deliver(sink, &self.identity.attributes_change(weight));
            next.last_status_sent = Some(now);
        }

        next
    }
}

fn deliver<S: MessageSink>(sink: &mut S, msg: &Message) {
    if let Err(e) = sink.dispatch(msg) {
        warn!(kind = %msg.kind(), action = msg.action(), error = %e, "message dropped");
    }
}
