//! Shared type definitions for the Simmer cooking session engine.
//!
//! This crate is the single source of truth for data that crosses crate or
//! process boundaries. Persisted records and identifiers flow to host UIs as
//! `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Session identifiers and item keys
//! - [`enums`] -- [`SessionState`]
//! - [`structs`] -- Catalog data: [`Recipe`], [`Ingredient`], [`ItemInfo`]
//! - [`records`] -- Persisted snapshots of the session, energy, and inventory
//! - [`observers`] -- [`ObserverSet`] registration for change observers

pub mod enums;
pub mod ids;
pub mod observers;
pub mod records;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::SessionState;
pub use ids::{ItemId, SessionId};
pub use observers::{ObserverId, ObserverSet};
pub use records::{EnergyRecord, InventoryEntry, InventoryRecord, SessionRecord};
pub use structs::{Ingredient, ItemInfo, Recipe};
