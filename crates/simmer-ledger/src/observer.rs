//! Inventory change notifications.
//!
//! Observers run after every successful credit, debit and load, once the
//! new contents have been written. They see the whole map in id order.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use simmer_types::ItemId;

/// Receiver of inventory changes.
pub trait InventoryObserver: Send {
    /// Called with the full contents after each change.
    fn on_inventory_changed(&mut self, items: &BTreeMap<ItemId, u32>);
}

impl<F> InventoryObserver for F
where
    F: FnMut(&BTreeMap<ItemId, u32>) + Send,
{
    fn on_inventory_changed(&mut self, items: &BTreeMap<ItemId, u32>) {
        self(items);
    }
}

/// An observer that keeps every snapshot it was sent, shareable across
/// clones.
#[derive(Debug, Clone, Default)]
pub struct SnapshotLog {
    snapshots: Arc<Mutex<Vec<BTreeMap<ItemId, u32>>>>,
}

impl SnapshotLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of every snapshot so far, oldest first.
    pub fn snapshots(&self) -> Vec<BTreeMap<ItemId, u32>> {
        self.snapshots
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

impl InventoryObserver for SnapshotLog {
    fn on_inventory_changed(&mut self, items: &BTreeMap<ItemId, u32>) {
        if let Ok(mut snapshots) = self.snapshots.lock() {
            snapshots.push(items.clone());
        }
    }
}
