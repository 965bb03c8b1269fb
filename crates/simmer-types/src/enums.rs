//! Enumeration types shared between the engine and its hosts.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Lifecycle state of the cooking session.
///
/// The only legal transitions are `Idle -> Running`, `Running -> Paused`,
/// `Paused -> Running`, and `Running -> Idle` through completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum SessionState {
    /// No recipe is cooking.
    #[default]
    Idle,
    /// A recipe is cooking and the timer is counting down.
    Running,
    /// A recipe is in progress but the timer is frozen.
    Paused,
}

impl SessionState {
    /// Whether a session is active (running or paused).
    ///
    /// This is the `is_cooking` flag carried by state-change notifications
    /// and by the persisted session record.
    pub const fn is_cooking(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }
}

impl core::fmt::Display for SessionState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
        };
        f.write_str(label)
    }
}
