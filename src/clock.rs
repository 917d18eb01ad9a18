//! Clock sources feeding envelope timestamps and nonces
//!
//! Wall-clock seconds come from whatever keeps the host clock in sync (NTP
//! daemon, RTC). The microsecond tick is free-running since process start and
//! never follows wall-clock corrections.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Envelope timestamp: epoch seconds plus a free-running microsecond tick
///
/// `usec` is not bounded to < 1_000_000. Ordering is lexicographic on
/// `(sec, usec)`, which is what the nonce authority relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    pub sec: u64,
    pub usec: u32,
}

impl Timestamp {
    pub fn new(sec: u64, usec: u32) -> Self {
        Self { sec, usec }
    }

    /// Smallest timestamp strictly greater than `self`
    ///
    /// Carries into `sec` when `usec` is exhausted. Returns `None` only at
    /// `(u64::MAX, u32::MAX)`.
    pub fn successor(&self) -> Option<Self> {
        match self.usec.checked_add(1) {
            Some(usec) => Some(Self { sec: self.sec, usec }),
            None => self.sec.checked_add(1).map(|sec| Self { sec, usec: 0 }),
        }
    }
}

/// Source of wall-clock seconds and a sub-second tick
pub trait ClockSource {
    /// Best-known epoch seconds; `0` if the host clock was never set
    fn now_seconds(&self) -> u64;

    /// Free-running microsecond counter, wraps at `u32::MAX`
    fn now_micros(&self) -> u32;

    fn now(&self) -> Timestamp {
        Timestamp::new(self.now_seconds(), self.now_micros())
    }
}

impl<C: ClockSource + ?Sized> ClockSource for Arc<C> {
    fn now_seconds(&self) -> u64 {
        (**self).now_seconds()
    }

    fn now_micros(&self) -> u32 {
        (**self).now_micros()
    }
}

impl<C: ClockSource + ?Sized> ClockSource for &C {
    fn now_seconds(&self) -> u64 {
        (**self).now_seconds()
    }

    fn now_micros(&self) -> u32 {
        (**self).now_micros()
    }
}

/// Host clock: `SystemTime` seconds, `Instant` microseconds since creation
#[derive(Debug, Clone)]
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { started: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSource for SystemClock {
    fn now_seconds(&self) -> u64 {
        // A clock set before 1970 degrades to the epoch baseline
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    fn now_micros(&self) -> u32 {
        self.started.elapsed().as_micros() as u32
    }
}

/// Settable clock for simulations and tests
#[derive(Debug, Default)]
pub struct ManualClock {
    sec: AtomicU64,
    usec: AtomicU32,
}

impl ManualClock {
    pub fn new(sec: u64, usec: u32) -> Self {
        Self {
            sec: AtomicU64::new(sec),
            usec: AtomicU32::new(usec),
        }
    }

    pub fn set(&self, sec: u64, usec: u32) {
        self.sec.store(sec, Ordering::SeqCst);
        self.usec.store(usec, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: u64) {
        self.sec.fetch_add(secs, Ordering::SeqCst);
    }
}

impl ClockSource for ManualClock {
    fn now_seconds(&self) -> u64 {
        self.sec.load(Ordering::SeqCst)
    }

    fn now_micros(&self) -> u32 {
        self.usec.load(Ordering::SeqCst)
    }
}
