//! Persistence layer for the Simmer cooking session engine.
//!
//! Every durable record (cooking session, energy, inventory) is a single
//! JSON document stored under a string key. Writes are whole-value
//! overwrites and are atomic with respect to crashes.
//!
//! # Modules
//!
//! - [`store`] -- The [`Store`] trait and typed JSON helpers
//! - [`file_store`] -- One JSON file per key in a save directory
//! - [`memory_store`] -- In-process store with failure injection
//! - [`error`] -- [`DbError`]

pub mod error;
pub mod file_store;
pub mod memory_store;
pub mod store;

pub use error::DbError;
pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use store::{Store, load_json, save_json};
