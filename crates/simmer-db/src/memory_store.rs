//! In-process store used by tests and ephemeral runs.
//!
//! Supports failure injection so callers can exercise their handling of
//! persistence errors without touching the filesystem.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::error::DbError;
use crate::store::{Store, validate_key};

/// A [`Store`] holding values in a map behind a mutex.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    writes: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `write` and `delete` fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `read` fail (or succeed again).
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes since creation.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Whether `key` currently holds a value.
    pub fn contains(&self, key: &str) -> bool {
        self.lock().is_ok_and(|entries| entries.contains_key(key))
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, String>>, DbError> {
        self.entries
            .lock()
            .map_err(|e| DbError::Unavailable(format!("memory store lock poisoned: {e}")))
    }

    fn check_writable(&self, key: &str) -> Result<(), DbError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable(format!("write to {key} refused")));
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, DbError> {
        validate_key(key)?;
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable(format!("read of {key} refused")));
        }
        Ok(self.lock()?.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), DbError> {
        validate_key(key)?;
        self.check_writable(key)?;
        self.lock()?.insert(key.to_owned(), value.to_owned());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), DbError> {
        validate_key(key)?;
        self.check_writable(key)?;
        self.lock()?.remove(key);
        Ok(())
    }
}
