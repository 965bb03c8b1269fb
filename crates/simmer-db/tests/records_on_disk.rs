//! Integration tests: typed records stored through [`FileStore`].

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use simmer_db::{DbError, FileStore, MemoryStore, Store, load_json, save_json};
use simmer_types::{EnergyRecord, InventoryEntry, InventoryRecord, ItemId, SessionRecord};

#[test]
fn session_record_survives_reopen() {
    let temp_dir = tempfile::tempdir().unwrap();
    let record = SessionRecord {
        is_cooking: true,
        recipe_name: "Tomato Soup".to_owned(),
        end_time_epoch: 1_700_000_060,
        total_duration: 60.0,
        ..SessionRecord::default()
    };

    {
        let store = FileStore::open(temp_dir.path()).unwrap();
        save_json(&store, "player_cooking", &record).unwrap();
    }

    let reopened = FileStore::open(temp_dir.path()).unwrap();
    let loaded: Option<SessionRecord> = load_json(&reopened, "player_cooking").unwrap();
    assert_eq!(loaded, Some(record));
}

#[test]
fn missing_record_loads_as_none() {
    let temp_dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(temp_dir.path()).unwrap();
    let loaded: Option<EnergyRecord> = load_json(&store, "player_energy").unwrap();
    assert!(loaded.is_none());
}

#[test]
fn corrupt_record_is_a_serialization_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(temp_dir.path()).unwrap();
    std::fs::write(temp_dir.path().join("player_inventory.json"), "{ not json").unwrap();

    let loaded: Result<Option<InventoryRecord>, DbError> = load_json(&store, "player_inventory");
    assert!(matches!(loaded, Err(DbError::Serialization { .. })));
}

#[test]
fn stores_are_usable_as_trait_objects() {
    let temp_dir = tempfile::tempdir().unwrap();
    let stores: Vec<Arc<dyn Store>> = vec![
        Arc::new(MemoryStore::new()),
        Arc::new(FileStore::open(temp_dir.path()).unwrap()),
    ];
    let record = InventoryRecord {
        items: vec![InventoryEntry {
            id: ItemId::from("tomato"),
            amount: 3,
        }],
    };

    for store in stores {
        save_json(store.as_ref(), "player_inventory", &record).unwrap();
        let loaded: Option<InventoryRecord> =
            load_json(store.as_ref(), "player_inventory").unwrap();
        assert_eq!(loaded.as_ref(), Some(&record));
    }
}
