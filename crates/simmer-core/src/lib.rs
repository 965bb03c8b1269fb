//! Cooking session engine for Simmer.
//!
//! This crate owns the wall-clock cooking timer and everything it touches:
//! the injectable clock, the regenerating energy pool, the recipe and item
//! catalogs, the session state machine, and startup recovery.
//!
//! # Modules
//!
//! - [`clock`] -- [`Clock`] trait with [`SystemClock`] and [`ManualClock`].
//! - [`config`] -- Configuration loading from `simmer-config.yaml`.
//! - [`energy`] -- [`EnergyPool`]: bounded energy with lazy regeneration,
//!   observed through [`EnergyObserver`].
//! - [`catalog`] -- [`RecipeCatalog`] and [`ItemCatalog`] loaded from JSON.
//! - [`notify`] -- [`SessionEvent`] and the [`SessionObserver`] trait.
//! - [`session`] -- [`SessionEngine`]: start, pause, resume, poll, complete.
//! - [`recovery`] -- [`RecoveryCoordinator`]: resolve a persisted session
//!   once the catalog is available.
//!
//! # Single logical thread
//!
//! Nothing here locks. The host owns the engine, the pool, and the ledger,
//! and calls into them from one task at a time.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod energy;
pub mod notify;
pub mod recovery;
pub mod session;

pub use catalog::{CatalogError, ItemCatalog, RecipeCatalog};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, PausePolicy, SimmerConfig};
pub use energy::{EnergyError, EnergyObserver, EnergyPool};
pub use notify::{EventLog, ObserverId, SessionEvent, SessionObserver};
pub use recovery::{DiscardReason, RecoveryCoordinator, RecoveryOutcome};
pub use session::{PollOutcome, SessionEngine, SessionError, Shortfall};
