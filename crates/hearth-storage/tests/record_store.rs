//! Integration tests for the record store.

use std::sync::Arc;
use std::thread;

use hearth_core::{NewRecord, SnapshotSource};
use hearth_storage::{Error, RecordStore};
use tempfile::TempDir;

fn create_temp_store() -> (TempDir, RecordStore) {
    let dir = TempDir::new().unwrap();
    let store = RecordStore::open(dir.path().join("data").join("records.redb")).unwrap();
    (dir, store)
}

#[test]
fn test_unknown_device_is_rejected_without_write() {
    let (_dir, store) = create_temp_store();
    store.register_device("lamp").unwrap();

    let result = store.add_record(NewRecord::new("toaster", true));
    assert!(matches!(result, Err(Error::UnknownDevice(ref d)) if d == "toaster"));

    assert_eq!(store.record_count().unwrap(), 0);
    assert!(!store.device_exists("toaster").unwrap());
    assert_eq!(store.distinct_devices().unwrap(), vec!["lamp".to_string()]);
}

#[test]
fn test_add_record_updates_state_and_last() {
    let (_dir, store) = create_temp_store();
    store.register_device("lamp").unwrap();
    store.register_device("fan").unwrap();

    let first = store.add_record(NewRecord::new("lamp", true)).unwrap();
    assert_eq!(first.device, "lamp");
    assert!(first.state);

    let snapshot = store.states().unwrap();
    assert_eq!(snapshot.get("lamp"), Some(true));
    assert_eq!(snapshot.get("fan"), Some(false));

    let second = store.add_record(NewRecord::new("lamp", false)).unwrap();
    let last = store.last_by_device("lamp").unwrap().unwrap();
    assert_eq!(last, second);
    assert!(second.date >= first.date);

    assert!(store.last_by_device("fan").unwrap().is_none());
    assert!(matches!(
        store.last_by_device("heater"),
        Err(Error::UnknownDevice(_))
    ));
}

#[test]
fn test_data_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("records.redb");

    {
        let store = RecordStore::open(&path).unwrap();
        store.register_device("lamp").unwrap();
        store.add_record(NewRecord::new("lamp", true)).unwrap();
    }

    let store = RecordStore::open(&path).unwrap();
    assert_eq!(store.states().unwrap().get("lamp"), Some(true));
    let next = store.add_record(NewRecord::new("lamp", false)).unwrap();
    assert_eq!(next.id, 2);
}

#[test]
fn test_snapshot_source_contract() {
    let (_dir, store) = create_temp_store();
    store.register_device("lamp").unwrap();

    let source: &dyn SnapshotSource = &store;
    assert!(source.device_exists("lamp").unwrap());
    assert!(!source.device_exists("fan").unwrap());
    assert_eq!(source.snapshot().unwrap().len(), 1);
}

#[test]
fn test_concurrent_readers_and_writer() {
    let (_dir, store) = create_temp_store();
    store.register_device("lamp").unwrap();
    store.register_device("fan").unwrap();
    let store = Arc::new(store);

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..50 {
                    let snapshot = store.snapshot().unwrap();
                    assert_eq!(snapshot.len(), 2);
                }
            })
        })
        .collect();

    for i in 0..20 {
        store
            .add_record(NewRecord::new("lamp", i % 2 == 0))
            .unwrap();
    }

    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(store.record_count().unwrap(), 20);
    assert_eq!(store.states().unwrap().get("lamp"), Some(false));
}

#[test]
fn test_health_check() {
    let (_dir, store) = create_temp_store();
    assert!(store.health_check().is_ok());
}
