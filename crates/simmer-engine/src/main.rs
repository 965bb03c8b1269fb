//! Host binary for Simmer.
//!
//! Wires storage, the energy pool, the inventory, and the session engine
//! together, recovers any session left over from the previous run, runs
//! one operator command, and then polls a running session until it
//! finishes or Ctrl-C arrives.
//!
//! # Startup Sequence
//!
//! 1. Parse the command line
//! 2. Load configuration from `simmer-config.yaml` (env overrides applied)
//! 3. Initialize structured logging (tracing) from the `logging` section
//! 4. Open the file store at `storage.data_dir`
//! 5. Open the energy pool, inventory, and session engine
//! 6. Register the logging observers
//! 7. Load catalogs on a blocking task and recover the staged session
//! 8. Dispatch the command
//! 9. Poll while the session is running
//! 10. Save all state

mod command;
mod error;
mod observer_log;
mod ticker;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use simmer_core::config::LoggingConfig;
use simmer_core::{
    CatalogError, Clock, EnergyPool, ItemCatalog, RecipeCatalog, RecoveryCoordinator,
    RecoveryOutcome, SessionEngine, SimmerConfig, SystemClock,
};
use simmer_db::{FileStore, Store};
use simmer_ledger::Ledger;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::command::Command;
use crate::error::EngineError;
use crate::observer_log::LoggingObserver;
use crate::ticker::LoopExit;

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if the command line is invalid, any subsystem fails
/// to open, the recipe catalog cannot be loaded, or the command is
/// refused.
#[tokio::main]
#[allow(clippy::too_many_lines)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Parse the command line.
    let command = Command::parse(std::env::args().skip(1))?;

    // 2. Load configuration.
    let config = load_config()?;

    // 3. Initialize structured logging.
    init_logging(&config.logging);
    info!(?command, "simmer-engine starting");
    info!(
        data_dir = %config.storage.data_dir.display(),
        energy_max = config.energy.max,
        regen_interval_secs = config.energy.regen_interval_secs,
        pause_policy = ?config.session.pause_policy,
        poll_interval_ms = config.session.poll_interval_ms,
        "Configuration loaded"
    );

    // 4. Open storage.
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store: Arc<dyn Store> =
        Arc::new(FileStore::open(&config.storage.data_dir).map_err(EngineError::from)?);

    // 5. Open state owners. The engine stages any persisted session.
    let mut energy = EnergyPool::open(
        config.energy,
        Arc::clone(&clock),
        Arc::clone(&store),
        config.storage.energy_key.as_str(),
    )
    .map_err(EngineError::from)?;
    let mut ledger = Ledger::open(Arc::clone(&store), config.storage.inventory_key.as_str())
        .map_err(EngineError::from)?;
    let mut engine = SessionEngine::open(
        clock,
        store,
        config.storage.session_key.as_str(),
        config.session.pause_policy,
    );

    // 6. Observe the session, the pool and the inventory through the log.
    engine.subscribe(LoggingObserver);
    energy.subscribe(LoggingObserver);
    ledger.subscribe(LoggingObserver);

    // 7. Load catalogs and recover. A failed load leaves the saved session
    //    untouched for the next run.
    let recipes_path = config.catalog.recipes_path.clone();
    let (outcome, recipes) =
        RecoveryCoordinator::run(&mut engine, &mut ledger, load_recipes(recipes_path))
            .await
            .map_err(EngineError::from)?;
    report_recovery(&outcome);
    let items = load_items(config.catalog.items_path.clone()).await;
    info!(
        recipes = recipes.len(),
        items = items.len(),
        "Catalogs loaded"
    );

    // 8. Dispatch the command.
    let dispatched = dispatch(&command, &recipes, &mut engine, &mut energy, &mut ledger);
    if let Err(e) = &dispatched {
        warn!(error = %e, "Command refused");
    }

    // 9. Poll while running.
    if dispatched.is_ok() && command.waits_for_completion() && engine.is_running() {
        let period = Duration::from_millis(config.session.poll_interval_ms);
        let exit = ticker::run_until_done(&mut engine, &mut ledger, period, shutdown_signal()).await;
        match exit {
            LoopExit::Completed(recipe) => {
                info!(recipe = %recipe.name, "Session finished");
            }
            LoopExit::Interrupted => {
                info!("Session saved, run again to keep cooking");
            }
            LoopExit::NotRunning(state) => {
                debug!(%state, "Poll loop ended");
            }
        }
    }

    report_status(&engine, &mut energy, &ledger, &items);

    // 10. Save all state.
    save_all(&engine, &mut energy, &ledger);
    info!("simmer-engine shutdown complete");

    dispatched.map_err(Into::into)
}

/// Load the configuration from `simmer-config.yaml`.
///
/// Looks for the config file relative to the current working directory.
/// Environment overrides apply in both cases.
fn load_config() -> Result<SimmerConfig, EngineError> {
    let config_path = Path::new("simmer-config.yaml");
    if config_path.exists() {
        Ok(SimmerConfig::from_file(config_path)?)
    } else {
        Ok(SimmerConfig::parse("")?)
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured
/// level.
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Read the recipe catalog on the blocking pool.
async fn load_recipes(path: PathBuf) -> Result<RecipeCatalog, CatalogError> {
    match tokio::task::spawn_blocking(move || RecipeCatalog::from_file(&path)).await {
        Ok(result) => result,
        Err(e) => Err(CatalogError::Aborted(e.to_string())),
    }
}

/// Read the item catalog on the blocking pool. Display names are
/// cosmetic, so a failure falls back to raw item ids.
async fn load_items(path: PathBuf) -> ItemCatalog {
    let loaded = match tokio::task::spawn_blocking(move || ItemCatalog::from_file(&path)).await {
        Ok(result) => result,
        Err(e) => Err(CatalogError::Aborted(e.to_string())),
    };
    loaded.unwrap_or_else(|e| {
        warn!(error = %e, "Item catalog unavailable, showing raw ids");
        ItemCatalog::default()
    })
}

fn report_recovery(outcome: &RecoveryOutcome) {
    match outcome {
        RecoveryOutcome::NothingToRecover => {}
        RecoveryOutcome::Resumed { remaining_secs } => {
            info!(remaining_secs, "Resumed cooking from last run");
        }
        RecoveryOutcome::RestoredPaused { remaining_secs } => {
            info!(remaining_secs, "Restored paused session from last run");
        }
        RecoveryOutcome::Completed(recipe) => {
            info!(recipe = %recipe.name, "Finished cooking while closed");
        }
        RecoveryOutcome::Discarded { recipe, reason } => {
            warn!(recipe = %recipe, ?reason, "Dropped saved session");
        }
    }
}

/// Run one operator command against the engine.
fn dispatch(
    command: &Command,
    recipes: &RecipeCatalog,
    engine: &mut SessionEngine,
    energy: &mut EnergyPool,
    ledger: &mut Ledger,
) -> Result<(), EngineError> {
    match command {
        Command::Status => {}
        Command::Cook { recipe } => {
            let found = recipes
                .get(recipe)
                .ok_or_else(|| EngineError::UnknownRecipe {
                    name: recipe.clone(),
                })?;
            let session_id = engine.start(found, energy, ledger)?;
            info!(%session_id, recipe = %found.name, "Cooking started");
        }
        Command::CookIndex { index } => {
            let session_id = engine.start_selected(recipes, *index, energy, ledger)?;
            info!(%session_id, index, "Cooking started");
        }
        Command::Pause => {
            let state = engine.pause(ledger)?;
            info!(%state, remaining_secs = engine.remaining_seconds(), "Pause applied");
        }
        Command::Resume => {
            let state = engine.resume(ledger)?;
            info!(%state, remaining_secs = engine.remaining_seconds(), "Resume applied");
        }
    }
    Ok(())
}

fn report_status(
    engine: &SessionEngine,
    energy: &mut EnergyPool,
    ledger: &Ledger,
    items: &ItemCatalog,
) {
    energy.refresh();
    info!(
        current = energy.current(),
        max = energy.max(),
        next_point_in_secs = energy.seconds_until_next(),
        "Energy"
    );

    match engine.recipe() {
        Some(recipe) => info!(
            state = %engine.state(),
            recipe = %recipe.name,
            remaining_secs = engine.remaining_seconds(),
            "Session"
        ),
        None => info!(state = %engine.state(), "Session"),
    }

    for (id, amount) in ledger.items() {
        info!(item = items.display_name(id.as_str()), amount, "Inventory");
    }
}

fn save_all(engine: &SessionEngine, energy: &mut EnergyPool, ledger: &Ledger) {
    if let Err(e) = engine.save() {
        error!(error = %e, "Failed to save session");
    }
    if let Err(e) = energy.save() {
        error!(error = %e, "Failed to save energy");
    }
    if let Err(e) = ledger.save() {
        error!(error = %e, "Failed to save inventory");
    }
}

/// Resolves on Ctrl-C. If the handler cannot be installed the loop runs
/// until the session ends on its own.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Ctrl-C handler unavailable");
        core::future::pending::<()>().await;
    }
}
