//! Wall-clock time source.
//!
//! Every comparison and subtraction of wall-clock time in the engine goes
//! through a [`Clock`] handed in at construction. Production code uses
//! [`SystemClock`]; tests drive a [`ManualClock`] forward (or backward) by
//! hand.
//!
//! Durable records store time as integer epoch seconds. The conversion
//! helpers saturate at chrono's representable range instead of failing.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, TimeDelta, Utc};

/// A source of the current UTC time.
pub trait Clock: Send + Sync + core::fmt::Debug {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Convert an instant to whole epoch seconds (floor).
    fn to_epoch_seconds(&self, at: DateTime<Utc>) -> i64 {
        at.timestamp()
    }

    /// Convert epoch seconds back to an instant, saturating out of range.
    fn from_epoch_seconds(&self, secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap_or(if secs < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
    }

    /// The current instant as epoch seconds.
    fn now_epoch(&self) -> i64 {
        self.to_epoch_seconds(self.now())
    }
}

/// The operating system's wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Millisecond resolution.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Create a clock frozen at `at`.
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(at.timestamp_millis()),
        }
    }

    /// Create a clock frozen at the given epoch second.
    pub fn at_epoch(secs: i64) -> Self {
        Self {
            millis: AtomicI64::new(secs.saturating_mul(1000)),
        }
    }

    /// Jump to `at`.
    pub fn set(&self, at: DateTime<Utc>) {
        self.millis.store(at.timestamp_millis(), Ordering::SeqCst);
    }

    /// Move the clock by `delta`, which may be negative.
    pub fn advance(&self, delta: TimeDelta) {
        let step = delta.num_milliseconds();
        // fetch_update only fails when the closure returns None.
        let _ = self
            .millis
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |ms| {
                Some(ms.saturating_add(step))
            });
    }

    /// Move the clock by whole seconds, which may be negative.
    pub fn advance_secs(&self, secs: i64) {
        self.advance(TimeDelta::try_seconds(secs).unwrap_or(TimeDelta::MAX));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let ms = self.millis.load(Ordering::SeqCst);
        DateTime::from_timestamp_millis(ms).unwrap_or(if ms < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
    }
}
