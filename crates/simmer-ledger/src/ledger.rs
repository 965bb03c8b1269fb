//! The inventory ledger: item id to held quantity.
//!
//! # Invariants
//!
//! - Every stored count is strictly positive. A count that reaches zero is
//!   removed, so a missing key and a zero count mean the same thing.
//! - Failed operations never mutate the map.
//! - Every successful mutation persists the full inventory. A persistence
//!   failure is logged and the in-memory map stays authoritative until the
//!   next successful write.
//! - Observers hear about a change only after its write was attempted.

use std::collections::BTreeMap;
use std::sync::Arc;

use simmer_db::{DbError, Store, load_json, save_json};
use simmer_types::{
    InventoryEntry, InventoryRecord, ItemId, ObserverId, ObserverSet, SessionId,
};

use crate::LedgerError;
use crate::journal::{Direction, EntryReason, Journal};
use crate::observer::InventoryObserver;

/// Item counts held by the player, backed by a durable store.
#[derive(Debug)]
pub struct Ledger {
    items: BTreeMap<ItemId, u32>,
    journal: Journal,
    observers: ObserverSet<dyn InventoryObserver>,
    store: Arc<dyn Store>,
    key: String,
}

impl Ledger {
    /// Create an empty ledger that persists to `key` in `store`.
    ///
    /// Nothing is read from the store; see [`Ledger::open`].
    pub fn new(store: Arc<dyn Store>, key: impl Into<String>) -> Self {
        Self {
            items: BTreeMap::new(),
            journal: Journal::new(),
            observers: ObserverSet::default(),
            store,
            key: key.into(),
        }
    }

    /// Create a ledger and load its contents from the store.
    ///
    /// A missing record yields an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Db`] if the record exists but cannot be read
    /// or decoded.
    pub fn open(store: Arc<dyn Store>, key: impl Into<String>) -> Result<Self, LedgerError> {
        let mut ledger = Self::new(store, key);
        ledger.load()?;
        Ok(ledger)
    }

    /// Replace the in-memory map with the persisted record.
    ///
    /// Entries with a non-positive amount are dropped. Repeated ids are
    /// summed. The journal is not touched.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Db`] if the record cannot be read or decoded;
    /// the in-memory map is left unchanged in that case.
    pub fn load(&mut self) -> Result<(), LedgerError> {
        let record: Option<InventoryRecord> = load_json(self.store.as_ref(), &self.key)?;
        let mut items = BTreeMap::new();
        let mut dropped: usize = 0;

        for entry in record.map(|r| r.items).unwrap_or_default() {
            if entry.amount <= 0 || entry.id.is_empty() {
                dropped = dropped.saturating_add(1);
                continue;
            }
            let amount = u32::try_from(entry.amount).unwrap_or(u32::MAX);
            let slot: &mut u32 = items.entry(entry.id).or_insert(0);
            *slot = slot.saturating_add(amount);
        }

        if dropped > 0 {
            tracing::warn!(key = %self.key, dropped, "Dropped non-positive inventory entries");
        }
        tracing::debug!(key = %self.key, items = items.len(), "Loaded inventory");
        self.items = items;
        self.notify();
        Ok(())
    }

    /// Register an observer for inventory changes.
    pub fn subscribe(&mut self, observer: impl InventoryObserver + 'static) -> ObserverId {
        self.observers.subscribe(Box::new(observer))
    }

    /// Remove an observer. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Whether at least `amount` of `item` is held. Always true for zero.
    pub fn has(&self, item: &str, amount: u32) -> bool {
        self.count(item) >= amount
    }

    /// Quantity of `item` held, zero if absent.
    pub fn count(&self, item: &str) -> u32 {
        self.items.get(item).copied().unwrap_or(0)
    }

    /// Add `amount` of `item`. Adding zero is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Overflow`] if the count would exceed `u32::MAX`.
    pub fn add(&mut self, item: &ItemId, amount: u32) -> Result<(), LedgerError> {
        self.credit(item, amount, EntryReason::Adjustment, None)
    }

    /// Remove `amount` of `item`. Removing zero is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Insufficient`] if fewer than `amount` are held.
    pub fn remove(&mut self, item: &ItemId, amount: u32) -> Result<(), LedgerError> {
        self.debit(item, amount, EntryReason::Adjustment, None)
    }

    /// Add `amount` of `item`, journaling the movement under `reason`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Overflow`] if the count would exceed `u32::MAX`.
    pub fn credit(
        &mut self,
        item: &ItemId,
        amount: u32,
        reason: EntryReason,
        reference: Option<SessionId>,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Ok(());
        }
        let current = self.count(item.as_str());
        let updated = current
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow {
                item: item.clone(),
                held: current,
                added: amount,
            })?;
        self.items.insert(item.clone(), updated);
        self.journal
            .record(item, amount, Direction::Credit, reason, reference);
        tracing::debug!(item = %item, amount, total = updated, ?reason, "Credited inventory");
        self.persist();
        self.notify();
        Ok(())
    }

    /// Remove `amount` of `item`, journaling the movement under `reason`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Insufficient`] if fewer than `amount` are held.
    pub fn debit(
        &mut self,
        item: &ItemId,
        amount: u32,
        reason: EntryReason,
        reference: Option<SessionId>,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Ok(());
        }
        let current = self.count(item.as_str());
        let remaining = current
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::Insufficient {
                item: item.clone(),
                requested: amount,
                available: current,
            })?;
        if remaining == 0 {
            self.items.remove(item.as_str());
        } else {
            self.items.insert(item.clone(), remaining);
        }
        self.journal
            .record(item, amount, Direction::Debit, reason, reference);
        tracing::debug!(item = %item, amount, total = remaining, ?reason, "Debited inventory");
        self.persist();
        self.notify();
        Ok(())
    }

    /// All held items in id order.
    pub const fn items(&self) -> &BTreeMap<ItemId, u32> {
        &self.items
    }

    /// Whether no items are held.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The movement journal for this process.
    pub const fn journal(&self) -> &Journal {
        &self.journal
    }

    /// The persisted form of the current contents.
    pub fn to_record(&self) -> InventoryRecord {
        InventoryRecord {
            items: self
                .items
                .iter()
                .map(|(id, amount)| InventoryEntry {
                    id: id.clone(),
                    amount: i64::from(*amount),
                })
                .collect(),
        }
    }

    /// Write the current contents to the store.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the write fails.
    pub fn save(&self) -> Result<(), DbError> {
        save_json(self.store.as_ref(), &self.key, &self.to_record())
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            tracing::error!(key = %self.key, error = %e, "Failed to persist inventory");
        }
    }

    fn notify(&mut self) {
        let items = &self.items;
        self.observers
            .for_each(|observer| observer.on_inventory_changed(items));
    }
}
