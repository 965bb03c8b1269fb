//! Persisted record types.
//!
//! Each record is a transport-safe snapshot of in-memory state: times are
//! integer epoch seconds, recipes are referenced by name, durations are
//! seconds as `f64`. Every field defaults when missing so that records
//! written by older revisions still load.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{ItemId, SessionId};

// ---------------------------------------------------------------------------
// Cooking session
// ---------------------------------------------------------------------------

/// Durable snapshot of the cooking session.
///
/// Written as a complete overwrite after every transition and deleted when
/// the session returns to idle. A missing record is equivalent to
/// `is_cooking == false`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(default)]
pub struct SessionRecord {
    /// Whether a session is active (running or paused).
    #[serde(alias = "isCooking")]
    pub is_cooking: bool,
    /// Name of the recipe being cooked.
    #[serde(alias = "recipeName")]
    pub recipe_name: String,
    /// Epoch second at which cooking completes. Meaningful while running.
    #[serde(alias = "endTimeUnix")]
    pub end_time_epoch: i64,
    /// Whether the session is paused.
    #[serde(alias = "isPaused")]
    pub is_paused: bool,
    /// Epoch second at which the current pause began. Meaningful while paused.
    #[serde(alias = "pauseStartUnix")]
    pub pause_start_epoch: i64,
    /// Seconds remaining when the pause began.
    #[serde(alias = "remainingTimeOnPause")]
    pub remaining_on_pause: f64,
    /// The recipe's original duration in seconds.
    #[serde(alias = "totalCookingDuration")]
    pub total_duration: f64,
    /// Session identifier, absent in records written by older revisions.
    pub session_id: Option<SessionId>,
}

// ---------------------------------------------------------------------------
// Energy
// ---------------------------------------------------------------------------

/// Durable snapshot of the energy pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(default)]
pub struct EnergyRecord {
    /// Energy available at `last_update_epoch`. Clamped to `[0, max]` on load.
    #[serde(alias = "currentEnergy")]
    pub current: i64,
    /// Epoch second anchoring regeneration math.
    pub last_update_epoch: i64,
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// One persisted inventory line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct InventoryEntry {
    /// Item identifier.
    pub id: ItemId,
    /// Quantity held. Entries with a non-positive amount are dropped on load.
    pub amount: i64,
}

/// Durable snapshot of the inventory ledger, ordered by item id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(default)]
pub struct InventoryRecord {
    /// All held items.
    pub items: Vec<InventoryEntry>,
}
