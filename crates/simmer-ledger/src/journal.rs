//! In-memory journal of inventory movements.
//!
//! The journal is append-only and lives for the process lifetime only. It
//! is an audit aid: the persisted inventory record is the source of truth.

use simmer_types::{ItemId, SessionId};

/// Which side of the inventory a movement touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Items entered the inventory.
    Credit,
    /// Items left the inventory.
    Debit,
}

/// Why a movement happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryReason {
    /// Direct `add`/`remove` by the host.
    Adjustment,
    /// Ingredient consumed when a cooking session starts.
    CookInput,
    /// Result item produced when a cooking session completes.
    CookOutput,
    /// Reversal of a partially applied cook-input debit.
    Rollback,
}

/// One recorded movement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Position in the journal, starting at 1.
    pub sequence: u64,
    /// Item moved.
    pub item: ItemId,
    /// Units moved. Always positive.
    pub quantity: u32,
    /// Credit or debit.
    pub direction: Direction,
    /// Why the movement happened.
    pub reason: EntryReason,
    /// The cooking session responsible, if any.
    pub reference: Option<SessionId>,
}

/// Append-only list of [`LedgerEntry`] values.
#[derive(Debug, Default, Clone)]
pub struct Journal {
    entries: Vec<LedgerEntry>,
}

impl Journal {
    /// Create an empty journal.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a movement.
    pub(crate) fn record(
        &mut self,
        item: &ItemId,
        quantity: u32,
        direction: Direction,
        reason: EntryReason,
        reference: Option<SessionId>,
    ) {
        let sequence = u64::try_from(self.entries.len())
            .unwrap_or(u64::MAX)
            .saturating_add(1);
        self.entries.push(LedgerEntry {
            sequence,
            item: item.clone(),
            quantity,
            direction,
            reason,
            reference,
        });
    }

    /// All entries in recording order.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Number of recorded entries.
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of quantities of `item` moved in `direction` for `reason`.
    pub fn total(&self, item: &str, direction: Direction, reason: EntryReason) -> u64 {
        self.entries
            .iter()
            .filter(|e| e.item.as_str() == item && e.direction == direction && e.reason == reason)
            .fold(0_u64, |acc, e| acc.saturating_add(u64::from(e.quantity)))
    }

    /// Entries attributed to a given cooking session.
    pub fn for_session(&self, session: SessionId) -> impl Iterator<Item = &LedgerEntry> {
        self.entries
            .iter()
            .filter(move |e| e.reference == Some(session))
    }
}
