use std::fs;

use gudang::{
    executor::insert::InsertFileScan,
    storage::heap_file::HeapFile,
    types::{error::StorageError, rid::Rid, DP_FIXED, PAGE_SIZE},
    utils::mock::TempStore,
};

fn sample_record(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| seed.wrapping_add(i as u8)).collect()
}

// Big enough that each data page holds exactly one record.
fn page_filling_record(seed: u8) -> Vec<u8> {
    sample_record((PAGE_SIZE - DP_FIXED) / 2 + 1, seed)
}

#[test]
fn test_create_rejects_existing_file() {
    let store = TempStore::new();
    let path = store.create_file("t.db");
    assert!(matches!(
        store.manager.create_heap_file(&path),
        Err(StorageError::FileExists { .. })
    ));
}

#[test]
fn test_fresh_file_is_header_plus_one_data_page() {
    let store = TempStore::new();
    let path = store.create_file("t.db");

    let len = fs::metadata(&path).unwrap().len();
    assert_eq!(len, 2 * PAGE_SIZE as u64);

    let heap = HeapFile::open(&store.manager, &path).unwrap();
    assert_eq!(heap.rec_cnt(), 0);
    assert_eq!(heap.file_name(), "t.db");
}

#[test]
fn test_open_missing_file() {
    let store = TempStore::new();
    assert!(matches!(
        HeapFile::open(&store.manager, store.path("missing.db")),
        Err(StorageError::FileNotFound { .. })
    ));
}

#[test]
fn test_header_name_is_truncated() {
    let store = TempStore::new();
    let long_name = "a_very_long_heap_file_name_that_overflows.db";
    let path = store.create_file(long_name);

    let heap = HeapFile::open(&store.manager, &path).unwrap();
    assert_eq!(heap.file_name(), &long_name[..31]);
}

#[test]
fn test_get_record_across_pages() {
    let store = TempStore::new();
    let path = store.create_file("t.db");

    let records: Vec<Vec<u8>> = (1..=3).map(page_filling_record).collect();
    let mut rids = Vec::new();
    {
        let mut insert = InsertFileScan::open(&store.manager, &path).unwrap();
        for rec in &records {
            rids.push(insert.insert_record(rec).unwrap());
        }
    }

    let mut heap = HeapFile::open(&store.manager, &path).unwrap();
    assert_eq!(heap.rec_cnt(), 3);

    // jump to the last page, then back to the first
    let rec = heap.get_record(rids[2]).unwrap();
    assert_eq!(rec.data, records[2]);
    let rec = heap.get_record(rids[0]).unwrap();
    assert_eq!(rec.data, records[0]);

    assert!(matches!(
        heap.get_record(Rid::new(rids[0].page_no, 99)),
        Err(StorageError::InvalidSlot { slot_no: 99 })
    ));
    assert!(matches!(
        heap.get_record(Rid::invalid()),
        Err(StorageError::InvalidPageNumber { .. })
    ));
}

#[test]
fn test_pin_accounting_during_open() {
    let store = TempStore::new();
    let path = store.create_file("t.db");

    let file_id = store.manager.disk().file_id(&path).unwrap();
    {
        let heap = HeapFile::open(&store.manager, &path).unwrap();
        let pool = store.manager.pool();
        // exactly one header pin and one data pin per instance
        assert_eq!(pool.pin_count(file_id, 1), Some(1));
        assert_eq!(pool.pin_count(file_id, 2), Some(1));
        drop(heap);
    }
    let pool = store.manager.pool();
    assert_eq!(pool.pin_count(file_id, 1), Some(0));
    assert_eq!(pool.pin_count(file_id, 2), Some(0));
}

#[test]
fn test_destroy_removes_file() {
    let store = TempStore::new();
    let path = store.create_file("t.db");

    store.manager.destroy_heap_file(&path).unwrap();
    assert!(!path.exists());
    assert!(matches!(
        store.manager.destroy_heap_file(&path),
        Err(StorageError::FileNotFound { .. })
    ));
}

#[test]
fn test_destroy_fails_while_open() {
    let store = TempStore::new();
    let path = store.create_file("t.db");

    let heap = HeapFile::open(&store.manager, &path).unwrap();
    assert!(matches!(
        store.manager.destroy_heap_file(&path),
        Err(StorageError::FileBusy { .. })
    ));
    drop(heap);
    store.manager.destroy_heap_file(&path).unwrap();
    assert!(!path.exists());
}

#[test]
fn test_data_survives_flush_and_reopen() {
    let store = TempStore::new();
    let path = store.create_file("t.db");

    let rec = sample_record(50, 3);
    let rid = {
        let mut insert = InsertFileScan::open(&store.manager, &path).unwrap();
        insert.insert_record(&rec).unwrap()
    };
    store.manager.flush().unwrap();

    // a second manager with a cold cache must read the same state
    let other = gudang::storage::storage_manager::StorageManager::new();
    let mut heap = HeapFile::open(&other, &path).unwrap();
    assert_eq!(heap.rec_cnt(), 1);
    assert_eq!(heap.get_record(rid).unwrap().data, rec);
}
