//! Inventory bookkeeping for the Simmer cooking session engine.
//!
//! The [`Ledger`] maps item ids to held quantities. Counts are unsigned and
//! strictly positive; absence of a key means zero. Every mutation persists
//! the whole inventory through a [`simmer_db::Store`] and appends a
//! [`LedgerEntry`] to an in-memory [`Journal`] so that cook inputs, outputs
//! and rollbacks can be audited.
//!
//! # Modules
//!
//! - [`ledger`] -- The [`Ledger`] struct: queries, credits, debits, load/save.
//! - [`journal`] -- The append-only [`Journal`] of movements.
//! - [`observer`] -- [`InventoryObserver`] change notifications.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use simmer_db::MemoryStore;
//! use simmer_ledger::Ledger;
//! use simmer_types::ItemId;
//!
//! let mut ledger = Ledger::new(Arc::new(MemoryStore::new()), "player_inventory");
//! let egg = ItemId::from("egg");
//! ledger.add(&egg, 2).ok();
//! assert!(ledger.has("egg", 2));
//! assert!(ledger.remove(&egg, 3).is_err());
//! ```

pub mod journal;
pub mod ledger;
pub mod observer;

pub use journal::{Direction, EntryReason, Journal, LedgerEntry};
pub use ledger::Ledger;
pub use observer::{InventoryObserver, SnapshotLog};
pub use simmer_types::ObserverId;

use simmer_types::ItemId;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when moving items in or out of the ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Not enough of the item is held to remove the requested amount.
    #[error("insufficient {item}: requested {requested}, available {available}")]
    Insufficient {
        /// The item being removed.
        item: ItemId,
        /// Amount requested.
        requested: u32,
        /// Amount held.
        available: u32,
    },

    /// The count would exceed the representable maximum.
    #[error("count overflow for {item}: held {held}, adding {added}")]
    Overflow {
        /// The item being added.
        item: ItemId,
        /// Amount held before the addition.
        held: u32,
        /// Amount being added.
        added: u32,
    },

    /// The persisted inventory could not be read or decoded.
    #[error("inventory storage error: {0}")]
    Db(#[from] simmer_db::DbError),
}
