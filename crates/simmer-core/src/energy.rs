//! The energy pool: a bounded resource that regenerates over wall-clock time.
//!
//! Regeneration is computed lazily from the anchor `last_update_epoch`
//! rather than by a background timer:
//!
//! ```text
//! steps   = floor((now - last_update_epoch) / interval)
//! current = min(current + steps, max)
//! last_update_epoch += steps * interval
//! ```
//!
//! Advancing the anchor by whole intervals (instead of resetting it to now)
//! keeps fractional progress toward the next point. Spending resets the
//! anchor to now. A negative elapsed interval (the wall clock moved
//! backward) regenerates nothing and re-anchors to now.
//!
//! Queries project regeneration without mutating; mutations materialize it
//! first and then persist `{current, last_update_epoch}`. Observers hear
//! `(current, max)` after every spend, add or restore, and whenever a
//! refresh or save materializes regenerated points.

use std::sync::Arc;

use simmer_db::{DbError, Store, load_json, save_json};
use simmer_types::{EnergyRecord, ObserverId, ObserverSet};

use crate::clock::Clock;
use crate::config::EnergyConfig;

/// Errors that can occur in energy pool operations.
#[derive(Debug, thiserror::Error)]
pub enum EnergyError {
    /// Not enough energy for the requested spend.
    #[error("insufficient energy: requested {requested}, available {available}")]
    Insufficient {
        /// Amount requested.
        requested: u32,
        /// Amount available after regeneration.
        available: u32,
    },

    /// Invalid pool parameters.
    #[error("invalid energy configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong.
        reason: String,
    },

    /// The persisted record could not be read or decoded.
    #[error("energy storage error: {0}")]
    Db(#[from] DbError),
}

/// Receiver of energy level changes.
pub trait EnergyObserver: Send {
    /// Called with the level and the maximum after each change.
    fn on_energy_changed(&mut self, current: u32, max: u32);
}

impl<F> EnergyObserver for F
where
    F: FnMut(u32, u32) + Send,
{
    fn on_energy_changed(&mut self, current: u32, max: u32) {
        self(current, max);
    }
}

/// Regenerating energy pool backed by a durable store.
#[derive(Debug)]
pub struct EnergyPool {
    current: u32,
    max: u32,
    interval_secs: u32,
    last_update_epoch: i64,
    observers: ObserverSet<dyn EnergyObserver>,
    clock: Arc<dyn Clock>,
    store: Arc<dyn Store>,
    key: String,
}

impl EnergyPool {
    /// Create a full pool anchored at now without touching the store.
    ///
    /// # Errors
    ///
    /// Returns [`EnergyError::InvalidConfig`] if `max` or the interval is zero.
    pub fn new(
        config: EnergyConfig,
        clock: Arc<dyn Clock>,
        store: Arc<dyn Store>,
        key: impl Into<String>,
    ) -> Result<Self, EnergyError> {
        if config.max == 0 {
            return Err(EnergyError::InvalidConfig {
                reason: "max must be at least 1".to_owned(),
            });
        }
        if config.regen_interval_secs == 0 {
            return Err(EnergyError::InvalidConfig {
                reason: "regen_interval_secs must be at least 1".to_owned(),
            });
        }
        let last_update_epoch = clock.now_epoch();
        Ok(Self {
            current: config.max,
            max: config.max,
            interval_secs: config.regen_interval_secs,
            last_update_epoch,
            observers: ObserverSet::default(),
            clock,
            store,
            key: key.into(),
        })
    }

    /// Open the pool from its persisted record.
    ///
    /// If no record exists the pool starts full, anchored at now, and that
    /// default is written immediately. A loaded `current` is clamped to
    /// `[0, max]`; a record with no anchor (`last_update_epoch == 0`) is
    /// anchored at now.
    ///
    /// # Errors
    ///
    /// Returns [`EnergyError::InvalidConfig`] for bad parameters and
    /// [`EnergyError::Db`] if an existing record cannot be read.
    pub fn open(
        config: EnergyConfig,
        clock: Arc<dyn Clock>,
        store: Arc<dyn Store>,
        key: impl Into<String>,
    ) -> Result<Self, EnergyError> {
        let mut pool = Self::new(config, clock, store, key)?;
        let record: Option<EnergyRecord> = load_json(pool.store.as_ref(), &pool.key)?;

        match record {
            Some(record) => {
                let clamped = record.current.clamp(0, i64::from(pool.max));
                pool.current = u32::try_from(clamped).unwrap_or(pool.max);
                if record.last_update_epoch != 0 {
                    pool.last_update_epoch = record.last_update_epoch;
                }
                tracing::info!(
                    key = %pool.key,
                    current = pool.current,
                    max = pool.max,
                    "Loaded energy"
                );
            }
            None => {
                tracing::info!(key = %pool.key, max = pool.max, "No energy record, starting full");
                pool.persist();
            }
        }
        Ok(pool)
    }

    /// Register an observer for level changes.
    pub fn subscribe(&mut self, observer: impl EnergyObserver + 'static) -> ObserverId {
        self.observers.subscribe(Box::new(observer))
    }

    /// Remove an observer. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Energy available now, including regeneration since the last update.
    pub fn current(&self) -> u32 {
        self.projected(self.clock.now_epoch()).0
    }

    /// Maximum energy.
    pub const fn max(&self) -> u32 {
        self.max
    }

    /// Seconds per regenerated point.
    pub const fn interval_secs(&self) -> u32 {
        self.interval_secs
    }

    /// Whether the pool is at its maximum.
    pub fn is_full(&self) -> bool {
        self.current() >= self.max
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.current() == 0
    }

    /// Whether at least `amount` is available now.
    pub fn has(&self, amount: u32) -> bool {
        self.current() >= amount
    }

    /// Seconds until the next point regenerates, or 0 when full.
    pub fn seconds_until_next(&self) -> u64 {
        let now = self.clock.now_epoch();
        let (current, anchor) = self.projected(now);
        if current >= self.max {
            return 0;
        }
        let into_step = now.saturating_sub(anchor).max(0);
        let left = i64::from(self.interval_secs).saturating_sub(into_step);
        u64::try_from(left).unwrap_or(0)
    }

    /// Materialize regeneration up to now without persisting.
    pub fn refresh(&mut self) {
        if self.materialize() {
            self.notify();
        }
    }

    /// Spend `amount`. Spending zero is a no-op.
    ///
    /// On success the regeneration anchor moves to now and the pool is
    /// persisted.
    ///
    /// # Errors
    ///
    /// Returns [`EnergyError::Insufficient`] without deducting anything if
    /// less than `amount` is available.
    pub fn spend(&mut self, amount: u32) -> Result<(), EnergyError> {
        if amount == 0 {
            return Ok(());
        }
        let regenerated = self.materialize();
        let Some(remaining) = self.current.checked_sub(amount) else {
            if regenerated {
                self.notify();
            }
            return Err(EnergyError::Insufficient {
                requested: amount,
                available: self.current,
            });
        };
        self.current = remaining;
        self.last_update_epoch = self.clock.now_epoch();
        tracing::debug!(amount, current = self.current, max = self.max, "Spent energy");
        self.persist();
        self.notify();
        Ok(())
    }

    /// Add `amount`, clamped to the maximum, and persist.
    pub fn add(&mut self, amount: u32) {
        if amount == 0 {
            return;
        }
        self.materialize();
        let before = self.current;
        self.current = self.current.saturating_add(amount).min(self.max);
        tracing::debug!(amount, from = before, to = self.current, max = self.max, "Added energy");
        self.persist();
        self.notify();
    }

    /// Put the pool back to an earlier [`EnergyPool::to_record`] snapshot,
    /// anchor included, and persist it.
    pub(crate) fn restore(&mut self, record: EnergyRecord) {
        let clamped = record.current.clamp(0, i64::from(self.max));
        self.current = u32::try_from(clamped).unwrap_or(self.max);
        self.last_update_epoch = record.last_update_epoch;
        tracing::debug!(current = self.current, anchor = self.last_update_epoch, "Restored energy");
        self.persist();
        self.notify();
    }

    /// The persisted form of the pool as of its last materialization.
    pub fn to_record(&self) -> EnergyRecord {
        EnergyRecord {
            current: i64::from(self.current),
            last_update_epoch: self.last_update_epoch,
        }
    }

    /// Materialize regeneration and write the pool to the store.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the write fails.
    pub fn save(&mut self) -> Result<(), DbError> {
        let regenerated = self.materialize();
        let written = save_json(self.store.as_ref(), &self.key, &self.to_record());
        if regenerated {
            self.notify();
        }
        written
    }

    /// Apply regeneration up to now. Returns whether the level changed.
    fn materialize(&mut self) -> bool {
        let (current, anchor) = self.projected(self.clock.now_epoch());
        let changed = current != self.current;
        if changed {
            tracing::trace!(from = self.current, to = current, "Energy regenerated");
        }
        self.current = current;
        self.last_update_epoch = anchor;
        changed
    }

    fn notify(&mut self) {
        let (current, max) = (self.current, self.max);
        self.observers
            .for_each(|observer| observer.on_energy_changed(current, max));
    }

    fn persist(&self) {
        if let Err(e) = save_json(self.store.as_ref(), &self.key, &self.to_record()) {
            tracing::error!(key = %self.key, error = %e, "Failed to persist energy");
        }
    }

    /// `(current, anchor)` after applying regeneration up to `now`.
    fn projected(&self, now: i64) -> (u32, i64) {
        let elapsed = now.saturating_sub(self.last_update_epoch);
        if elapsed < 0 {
            return (self.current, now);
        }
        let interval = i64::from(self.interval_secs);
        let steps = elapsed.checked_div(interval).unwrap_or(0);
        if steps == 0 {
            return (self.current, self.last_update_epoch);
        }
        let gained = u32::try_from(steps).unwrap_or(u32::MAX);
        let current = self.current.saturating_add(gained).min(self.max);
        let anchor = self
            .last_update_epoch
            .saturating_add(steps.saturating_mul(interval));
        (current, anchor)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use simmer_db::MemoryStore;

    use super::*;
    use crate::clock::ManualClock;

    const T0: i64 = 1_700_000_000;
    const KEY: &str = "player_energy";

    fn pool_with(max: u32, interval: u32) -> (Arc<ManualClock>, Arc<MemoryStore>, EnergyPool) {
        let clock = Arc::new(ManualClock::at_epoch(T0));
        let store = Arc::new(MemoryStore::new());
        let pool = EnergyPool::open(
            EnergyConfig {
                max,
                regen_interval_secs: interval,
            },
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::clone(&store) as Arc<dyn Store>,
            KEY,
        )
        .unwrap();
        (clock, store, pool)
    }

    #[test]
    fn first_run_starts_full_and_persists() {
        let (_, store, pool) = pool_with(30, 5);
        assert_eq!(pool.current(), 30);
        assert!(pool.is_full());
        let saved: Option<EnergyRecord> = load_json(store.as_ref(), KEY).unwrap();
        assert_eq!(
            saved,
            Some(EnergyRecord {
                current: 30,
                last_update_epoch: T0
            })
        );
    }

    #[test]
    fn spend_all_then_regenerate_in_whole_steps() {
        let (clock, _, mut pool) = pool_with(30, 5);
        pool.spend(30).unwrap();
        assert_eq!(pool.current(), 0);
        assert!(pool.is_empty());

        clock.advance_secs(12);
        assert!(pool.has(2));
        assert!(!pool.has(3));
        assert_eq!(pool.seconds_until_next(), 3);
    }

    #[test]
    fn anchor_keeps_fractional_progress() {
        let (clock, _, mut pool) = pool_with(30, 5);
        pool.spend(10).unwrap();
        clock.advance_secs(7);
        pool.refresh();
        assert_eq!(pool.current(), 21);
        assert_eq!(pool.to_record().last_update_epoch, T0 + 5);

        // Three more seconds complete the second step.
        clock.advance_secs(3);
        assert_eq!(pool.current(), 22);
    }

    #[test]
    fn insufficient_spend_deducts_nothing() {
        let (_, store, mut pool) = pool_with(30, 5);
        pool.spend(25).unwrap();
        let writes = store.write_count();

        let result = pool.spend(6);
        assert!(matches!(
            result,
            Err(EnergyError::Insufficient {
                requested: 6,
                available: 5
            })
        ));
        assert_eq!(pool.current(), 5);
        assert_eq!(store.write_count(), writes);
    }

    #[test]
    fn add_is_clamped_to_max() {
        let (_, _, mut pool) = pool_with(30, 5);
        pool.spend(4).unwrap();
        pool.add(10);
        assert_eq!(pool.current(), 30);
    }

    #[test]
    fn regeneration_never_exceeds_max() {
        let (clock, _, mut pool) = pool_with(30, 5);
        pool.spend(1).unwrap();
        clock.advance_secs(10_000);
        assert_eq!(pool.current(), 30);
        assert_eq!(pool.seconds_until_next(), 0);
    }

    #[test]
    fn backward_clock_regenerates_nothing_and_reanchors() {
        let (clock, _, mut pool) = pool_with(30, 5);
        pool.spend(10).unwrap();
        clock.advance_secs(-100);
        assert_eq!(pool.current(), 20);

        pool.refresh();
        assert_eq!(pool.to_record().last_update_epoch, T0 - 100);
        clock.advance_secs(5);
        assert_eq!(pool.current(), 21);
    }

    #[test]
    fn loaded_energy_is_clamped() {
        let clock = Arc::new(ManualClock::at_epoch(T0));
        let store = Arc::new(MemoryStore::new());
        store
            .write(KEY, r#"{"current": 99, "last_update_epoch": 1700000000}"#)
            .unwrap();
        let pool = EnergyPool::open(
            EnergyConfig::default(),
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::clone(&store) as Arc<dyn Store>,
            KEY,
        )
        .unwrap();
        assert_eq!(pool.current(), 30);

        store
            .write(KEY, r#"{"current": -4, "last_update_epoch": 1700000000}"#)
            .unwrap();
        let pool = EnergyPool::open(
            EnergyConfig::default(),
            clock as Arc<dyn Clock>,
            store as Arc<dyn Store>,
            KEY,
        )
        .unwrap();
        assert_eq!(pool.current(), 0);
    }

    #[test]
    fn regeneration_resumes_across_reopen() {
        let clock = Arc::new(ManualClock::at_epoch(T0));
        let store = Arc::new(MemoryStore::new());
        let open = || {
            EnergyPool::open(
                EnergyConfig::default(),
                Arc::clone(&clock) as Arc<dyn Clock>,
                Arc::clone(&store) as Arc<dyn Store>,
                KEY,
            )
            .unwrap()
        };

        let mut pool = open();
        pool.spend(30).unwrap();
        drop(pool);

        clock.advance_secs(60);
        let pool = open();
        assert_eq!(pool.current(), 12);
    }

    #[test]
    fn zero_config_rejected() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::at_epoch(T0));
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let result = EnergyPool::new(
            EnergyConfig {
                max: 0,
                regen_interval_secs: 5,
            },
            clock,
            store,
            KEY,
        );
        assert!(matches!(result, Err(EnergyError::InvalidConfig { .. })));
    }

    #[test]
    fn persist_failure_keeps_memory_state() {
        let (_, store, mut pool) = pool_with(30, 5);
        store.set_fail_writes(true);
        pool.spend(7).unwrap();
        assert_eq!(pool.current(), 23);
        assert!(pool.save().is_err());
        store.set_fail_writes(false);
        assert!(pool.save().is_ok());
    }

    #[test]
    fn observers_hear_each_change_after_it_is_written() {
        let (clock, store, mut pool) = pool_with(30, 5);
        let heard: Arc<std::sync::Mutex<Vec<(u32, u32, bool)>>> = Arc::default();
        let sink = Arc::clone(&heard);
        let shared_store = Arc::clone(&store);
        pool.subscribe(move |current: u32, max: u32| {
            let saved: Option<EnergyRecord> = load_json(shared_store.as_ref(), KEY).unwrap();
            let written = saved.is_some_and(|r| r.current == i64::from(current));
            if let Ok(mut heard) = sink.lock() {
                heard.push((current, max, written));
            }
        });

        pool.spend(10).unwrap();
        pool.add(3);
        clock.advance_secs(10);
        pool.save().unwrap();

        assert_eq!(
            *heard.lock().unwrap(),
            vec![(20, 30, true), (23, 30, true), (25, 30, true)]
        );
    }

    #[test]
    fn quiet_operations_do_not_notify() {
        let (clock, _, mut pool) = pool_with(30, 5);
        pool.spend(10).unwrap();
        let calls: Arc<std::sync::Mutex<u32>> = Arc::default();
        let sink = Arc::clone(&calls);
        let id = pool.subscribe(move |_: u32, _: u32| {
            if let Ok(mut calls) = sink.lock() {
                *calls = calls.saturating_add(1);
            }
        });

        pool.spend(0).unwrap();
        pool.add(0);
        assert!(pool.spend(25).is_err());
        clock.advance_secs(4);
        pool.refresh();
        assert_eq!(*calls.lock().unwrap(), 0);

        clock.advance_secs(1);
        pool.refresh();
        assert_eq!(*calls.lock().unwrap(), 1);

        assert!(pool.unsubscribe(id));
        pool.add(1);
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn restore_brings_back_level_and_anchor() {
        let (clock, store, mut pool) = pool_with(30, 5);
        pool.spend(10).unwrap();
        clock.advance_secs(3);
        let snapshot = pool.to_record();

        pool.spend(5).unwrap();
        assert_eq!(pool.seconds_until_next(), 5);

        pool.restore(snapshot);
        assert_eq!(pool.current(), 20);
        assert_eq!(pool.seconds_until_next(), 2);
        let saved: Option<EnergyRecord> = load_json(store.as_ref(), KEY).unwrap();
        assert_eq!(saved, Some(snapshot));
    }
}
