//! Observer that reports session, energy and inventory changes through
//! `tracing`.
//!
//! State changes and completions are logged at info. Countdown ticks are
//! logged at info only on milestones (every ten seconds, and each of the
//! final five) and at debug otherwise. Energy and inventory changes are
//! logged at debug.

use std::collections::BTreeMap;

use simmer_core::{EnergyObserver, SessionEvent, SessionObserver};
use simmer_ledger::InventoryObserver;
use simmer_types::ItemId;
use tracing::{debug, info};

/// Observer that bridges change notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

/// Whether a remaining-seconds value deserves an info line.
pub const fn is_milestone(remaining_secs: u64) -> bool {
    remaining_secs <= 5 || remaining_secs % 10 == 0
}

impl SessionObserver for LoggingObserver {
    fn on_event(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::TimeChanged(secs) if is_milestone(*secs) => {
                info!(remaining_secs = secs, "Cooking");
            }
            SessionEvent::TimeChanged(secs) => {
                debug!(remaining_secs = secs, "Cooking");
            }
            SessionEvent::StateChanged(state) => {
                info!(%state, is_cooking = state.is_cooking(), "Session state changed");
            }
            SessionEvent::Finished(recipe) => {
                info!(
                    recipe = %recipe.name,
                    result = %recipe.result_id,
                    stars = recipe.star_rating,
                    "Dish ready"
                );
            }
        }
    }
}

impl EnergyObserver for LoggingObserver {
    fn on_energy_changed(&mut self, current: u32, max: u32) {
        debug!(current, max, "Energy changed");
    }
}

impl InventoryObserver for LoggingObserver {
    fn on_inventory_changed(&mut self, items: &BTreeMap<ItemId, u32>) {
        let held = items
            .values()
            .fold(0_u64, |total, n| total.saturating_add(u64::from(*n)));
        debug!(kinds = items.len(), held, "Inventory changed");
    }
}

#[cfg(test)]
mod tests {
    use simmer_types::{ItemId, Recipe, SessionState};

    use super::*;

    #[test]
    fn milestones() {
        assert!(is_milestone(0));
        assert!(is_milestone(5));
        assert!(!is_milestone(6));
        assert!(is_milestone(10));
        assert!(!is_milestone(119));
        assert!(is_milestone(120));
    }

    #[test]
    fn handles_every_event_kind() {
        let mut observer = LoggingObserver;
        observer.on_event(&SessionEvent::StateChanged(SessionState::Running));
        observer.on_event(&SessionEvent::TimeChanged(7));
        observer.on_event(&SessionEvent::TimeChanged(3));
        observer.on_event(&SessionEvent::Finished(Recipe {
            name: "Tea".to_owned(),
            cost: 1,
            ingredients: Vec::new(),
            result_id: ItemId::from("tea"),
            duration_seconds: 30,
            star_rating: 1,
        }));
        observer.on_energy_changed(12, 30);
        observer.on_inventory_changed(&BTreeMap::from([(ItemId::from("tea"), 2)]));
    }
}
