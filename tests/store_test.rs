//! Behaviour every journal store must share, run against each backend.

mod common;

use common::*;
use std::sync::Arc;
use tempfile::TempDir;
use tradeflow::adapters::json_file_store::JsonFileStore;
use tradeflow::adapters::memory_store::MemoryStore;
use tradeflow::domain::error::TradeflowError;
use tradeflow::domain::journal::JournalDocument;
use tradeflow::ports::journal_store::JournalStore;

fn empty_store_loads_empty(store: &dyn JournalStore) {
    assert_eq!(store.load().unwrap(), JournalDocument::default());
    assert!(store.settings().unwrap().is_none());
    assert!(store.records().unwrap().is_empty());
}

fn settings_are_overwritten(store: &dyn JournalStore) {
    store.save_settings(&settings(1000.0, 5.0, 10.0)).unwrap();
    store.save_settings(&settings(2500.0, 2.0, 3.0)).unwrap();
    assert_eq!(store.settings().unwrap(), Some(settings(2500.0, 2.0, 3.0)));
}

fn invalid_settings_are_rejected(store: &dyn JournalStore) {
    let err = store.save_settings(&settings(-1.0, 5.0, 10.0)).unwrap_err();
    assert!(matches!(err, TradeflowError::InvalidSettings { .. }));
    let err = store.save_settings(&settings(100.0, 0.0, 10.0)).unwrap_err();
    assert!(matches!(err, TradeflowError::InvalidSettings { .. }));
}

fn one_trade_per_day(store: &dyn JournalStore) {
    store.save_settings(&settings(1000.0, 5.0, 10.0)).unwrap();
    store
        .insert_record(&trade("2024-05-01T09:00:00-03:00", 200.0, 3, 2, 1))
        .unwrap();

    let err = store
        .insert_record(&trade("2024-05-01T22:00:00-03:00", 10.0, 1, 1, 0))
        .unwrap_err();
    assert!(matches!(err, TradeflowError::DuplicateTrade { .. }));

    // bank operations are not trades
    store
        .insert_record(&deposit("2024-05-01T12:00:00-03:00", 100.0))
        .unwrap();
    store
        .insert_record(&withdrawal("2024-05-01T13:00:00-03:00", 50.0))
        .unwrap();

    let doc = store.load().unwrap();
    assert_eq!(doc.records.len(), 3);
    assert_eq!(doc.current_bank(), 1250.0);
}

fn records_keep_insertion_order(store: &dyn JournalStore) {
    let later = trade("2024-06-02T10:00:00Z", 1.0, 1, 1, 0);
    let earlier = trade("2024-06-01T10:00:00Z", 2.0, 1, 1, 0);
    store.insert_record(&later).unwrap();
    store.insert_record(&earlier).unwrap();
    assert_eq!(store.records().unwrap(), vec![later, earlier]);
}

fn duplicate_id_is_rejected(store: &dyn JournalStore) {
    let a = trade("2024-07-01T10:00:00Z", 1.0, 1, 1, 0);
    let mut b = deposit("2024-07-02T10:00:00Z", 5.0);
    b.id = a.id.clone();
    store.insert_record(&a).unwrap();
    assert!(matches!(
        store.insert_record(&b),
        Err(TradeflowError::DuplicateId { .. })
    ));
}

fn replace_and_delete(store: &dyn JournalStore) {
    store.save_settings(&settings(1000.0, 5.0, 10.0)).unwrap();
    let a = trade("2024-08-01T10:00:00Z", 200.0, 2, 1, 1);
    let b = trade("2024-08-02T10:00:00Z", -50.0, 2, 0, 2);
    store.insert_record(&a).unwrap();
    store.insert_record(&b).unwrap();

    let mut edited = a.clone();
    edited.return_value = 300.0;
    store.replace_record(&edited).unwrap();
    assert_eq!(store.record(&a.id).unwrap(), Some(edited));
    assert_eq!(store.load().unwrap().current_bank(), 1250.0);

    let mut moved = b.clone();
    moved.date = a.date;
    assert!(matches!(
        store.replace_record(&moved),
        Err(TradeflowError::DuplicateTrade { .. })
    ));

    store.delete_record(&a.id).unwrap();
    let doc = store.load().unwrap();
    assert_eq!(doc.records, vec![b]);
    assert_eq!(doc.current_bank(), 950.0);

    assert!(matches!(
        store.delete_record(&a.id),
        Err(TradeflowError::RecordNotFound { .. })
    ));
}

fn reset_clears_everything(store: &dyn JournalStore) {
    store.save_settings(&settings(1000.0, 5.0, 10.0)).unwrap();
    store
        .insert_record(&trade("2024-09-01T10:00:00Z", 1.0, 1, 1, 0))
        .unwrap();
    store.reset().unwrap();
    assert_eq!(store.load().unwrap(), JournalDocument::default());
}

fn run_all(make: impl Fn() -> Box<dyn JournalStore>) {
    empty_store_loads_empty(make().as_ref());
    settings_are_overwritten(make().as_ref());
    invalid_settings_are_rejected(make().as_ref());
    one_trade_per_day(make().as_ref());
    records_keep_insertion_order(make().as_ref());
    duplicate_id_is_rejected(make().as_ref());
    replace_and_delete(make().as_ref());
    reset_clears_everything(make().as_ref());
}

#[test]
fn memory_store_conforms() {
    run_all(|| Box::new(MemoryStore::new()));
}

#[test]
fn json_file_store_conforms() {
    let dir = TempDir::new().unwrap();
    let counter = std::cell::Cell::new(0);
    run_all(|| {
        counter.set(counter.get() + 1);
        Box::new(JsonFileStore::new(
            dir.path().join(format!("db-{}.json", counter.get())),
        ))
    });
}

#[cfg(feature = "sqlite")]
#[test]
fn sqlite_store_conforms() {
    use tradeflow::adapters::sqlite_store::SqliteStore;
    run_all(|| Box::new(SqliteStore::in_memory().unwrap()));
}

#[cfg(feature = "sqlite")]
#[test]
fn sqlite_file_store_survives_reopen() {
    use tradeflow::adapters::file_config_adapter::FileConfigAdapter;
    use tradeflow::adapters::sqlite_store::SqliteStore;

    let dir = TempDir::new().unwrap();
    let ini = format!("[sqlite]\npath = {}\n", dir.path().join("j.db").display());
    let cfg = FileConfigAdapter::from_string(&ini).unwrap();

    let store = SqliteStore::from_config(&cfg).unwrap();
    store.save_settings(&settings(1000.0, 5.0, 10.0)).unwrap();
    store
        .insert_record(&trade("2024-05-01T10:00:00Z", 42.0, 1, 1, 0))
        .unwrap();
    drop(store);

    let reopened = SqliteStore::from_config(&cfg).unwrap();
    assert_eq!(reopened.load().unwrap().current_bank(), 1042.0);
}

#[test]
fn json_file_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("database.json");
    {
        let store = JsonFileStore::new(&path);
        store.save_settings(&settings(1000.0, 5.0, 10.0)).unwrap();
        store
            .insert_record(&trade("2024-05-01T10:00:00Z", 200.0, 1, 1, 0))
            .unwrap();
        store
            .insert_record(&trade("2024-05-02T10:00:00Z", -50.0, 1, 0, 1))
            .unwrap();
    }
    let doc = JsonFileStore::new(&path).load().unwrap();
    assert_eq!(doc.current_bank(), 1150.0);
    assert_eq!(doc.records.len(), 2);
}

#[test]
fn concurrent_same_day_inserts_admit_one_trade() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileStore::new(dir.path().join("race.json")));

    let results: Vec<Result<(), TradeflowError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                scope.spawn(move || {
                    let hour = 8 + i;
                    store.insert_record(&trade(
                        &format!("2024-05-01T{hour:02}:00:00Z"),
                        f64::from(i),
                        1,
                        1,
                        0,
                    ))
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, TradeflowError::DuplicateTrade { .. }))
    );
    assert_eq!(store.records().unwrap().len(), 1);
}
