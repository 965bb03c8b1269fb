//! Startup recovery orchestration.
//!
//! The session record is read synchronously when the engine opens, but the
//! recipe catalog may arrive later (the host loads it off the main task).
//! [`RecoveryCoordinator`] waits for the catalog and then hands it to
//! [`SessionEngine::resolve_pending`]. It holds no state of its own.

use core::future::Future;

use simmer_ledger::Ledger;
use simmer_types::Recipe;

use crate::catalog::{CatalogError, RecipeCatalog};
use crate::session::SessionEngine;

/// Why a persisted session was thrown away during recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// The recipe name is not in the catalog.
    UnknownRecipe,
    /// Neither the record nor the recipe gives a positive duration.
    InvalidDuration,
}

/// How startup recovery concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// No active session was persisted.
    NothingToRecover,
    /// A running session continues with this many seconds left.
    Resumed {
        /// Remaining seconds, rounded up.
        remaining_secs: u64,
    },
    /// A paused session was restored with its remaining time intact.
    RestoredPaused {
        /// Remaining seconds, rounded up.
        remaining_secs: u64,
    },
    /// The session expired while the process was down and was completed.
    Completed(Recipe),
    /// The session was stale or corrupt and was discarded.
    Discarded {
        /// Name stored in the record.
        recipe: String,
        /// Why it was discarded.
        reason: DiscardReason,
    },
}

/// Connects catalog availability to session recovery.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryCoordinator;

impl RecoveryCoordinator {
    /// React to a loaded catalog by resolving any staged session.
    pub fn catalog_loaded(
        engine: &mut SessionEngine,
        catalog: &RecipeCatalog,
        ledger: &mut Ledger,
    ) -> RecoveryOutcome {
        let outcome = engine.resolve_pending(catalog, ledger);
        tracing::info!(?outcome, "Recovery finished");
        outcome
    }

    /// Await `load`, then resolve any staged session against its catalog.
    ///
    /// Returns the outcome together with the catalog so the host can keep
    /// using it.
    ///
    /// # Errors
    ///
    /// Returns the [`CatalogError`] from `load`. The engine stays in the
    /// recovering state and the persisted record is untouched, so a later
    /// successful load can still recover the session.
    pub async fn run<F>(
        engine: &mut SessionEngine,
        ledger: &mut Ledger,
        load: F,
    ) -> Result<(RecoveryOutcome, RecipeCatalog), CatalogError>
    where
        F: Future<Output = Result<RecipeCatalog, CatalogError>>,
    {
        if let Some(name) = engine.pending_recipe_name() {
            tracing::debug!(recipe = %name, "Waiting for recipe catalog");
        }
        let catalog = match load.await {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    pending = engine.is_recovering(),
                    "Recipe catalog failed to load"
                );
                return Err(e);
            }
        };
        let outcome = Self::catalog_loaded(engine, &catalog, ledger);
        Ok((outcome, catalog))
    }
}
