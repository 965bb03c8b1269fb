//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps every failure
//! mode during startup and command dispatch.

use simmer_core::{CatalogError, ConfigError, EnergyError, SessionError};
use simmer_db::DbError;
use simmer_ledger::LedgerError;

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The save directory could not be opened.
    #[error("storage error: {source}")]
    Storage {
        /// The underlying store error.
        #[from]
        source: DbError,
    },

    /// The energy pool could not be opened.
    #[error("energy error: {source}")]
    Energy {
        /// The underlying energy error.
        #[from]
        source: EnergyError,
    },

    /// The inventory could not be opened.
    #[error("inventory error: {source}")]
    Ledger {
        /// The underlying ledger error.
        #[from]
        source: LedgerError,
    },

    /// A catalog file could not be loaded.
    #[error("catalog error: {source}")]
    Catalog {
        /// The underlying catalog error.
        #[from]
        source: CatalogError,
    },

    /// A session operation was refused.
    #[error("session error: {source}")]
    Session {
        /// The underlying session error.
        #[from]
        source: SessionError,
    },

    /// The command line could not be understood.
    #[error("usage: {message}")]
    Usage {
        /// What was wrong with the arguments.
        message: String,
    },

    /// A named recipe is not in the catalog.
    #[error("unknown recipe: {name}")]
    UnknownRecipe {
        /// The requested name.
        name: String,
    },
}
