use std::fs;

use gudang::{
    types::{error::StorageError, PAGE_SIZE},
    utils::mock::TempStore,
};

#[test]
fn test_alloc_write_flush_readback() {
    let store = TempStore::new();
    let path = store.path("raw.db");
    let disk = store.manager.disk();
    let pool = store.manager.pool();

    disk.create_file(&path).unwrap();
    let file = disk.open_file(&path).unwrap();

    let mut pin = pool.alloc_page(&file).unwrap();
    assert_eq!(pin.page_no(), 1);
    pin.write()[..4].copy_from_slice(b"rose");
    drop(pin);

    pool.flush_file(&file).unwrap();
    let bytes = fs::read(&path).unwrap();
    assert_eq!(bytes.len(), PAGE_SIZE);
    assert_eq!(&bytes[..4], b"rose");
}

#[test]
fn test_pin_counts_accumulate_and_release() {
    let store = TempStore::new();
    let path = store.path("raw.db");
    let disk = store.manager.disk();
    let pool = store.manager.pool();

    disk.create_file(&path).unwrap();
    let file = disk.open_file(&path).unwrap();
    let pin = pool.alloc_page(&file).unwrap();
    let page_no = pin.page_no();

    let second = pool.read_page(&file, page_no).unwrap();
    assert_eq!(pool.pin_count(file.id(), page_no), Some(2));
    drop(second);
    assert_eq!(pool.pin_count(file.id(), page_no), Some(1));
    drop(pin);
    assert_eq!(pool.pin_count(file.id(), page_no), Some(0));
}

#[test]
fn test_unpin_without_pin_is_an_error() {
    let store = TempStore::new();
    let path = store.path("raw.db");
    let disk = store.manager.disk();
    let pool = store.manager.pool();

    disk.create_file(&path).unwrap();
    let file = disk.open_file(&path).unwrap();
    drop(pool.alloc_page(&file).unwrap());

    assert!(matches!(
        pool.unpin_page(file.id(), 1, false),
        Err(StorageError::PageNotPinned { page_no: 1 })
    ));
    assert!(matches!(
        pool.unpin_page(file.id(), 7, false),
        Err(StorageError::PageNotPinned { page_no: 7 })
    ));
}

#[test]
fn test_eviction_writes_dirty_pages_back() {
    let store = TempStore::with_pool_frames(2);
    let path = store.path("raw.db");
    let disk = store.manager.disk();
    let pool = store.manager.pool();

    disk.create_file(&path).unwrap();
    let file = disk.open_file(&path).unwrap();

    for seed in 1u8..=4 {
        let mut pin = pool.alloc_page(&file).unwrap();
        pin.write().fill(seed);
    }

    // with only two frames, the early pages were evicted; their content
    // must come back from disk intact
    for (page_no, seed) in (1..=4).zip(1u8..=4) {
        let pin = pool.read_page(&file, page_no).unwrap();
        assert!(pin.read().iter().all(|&b| b == seed), "page {page_no}");
    }
}

#[test]
fn test_pool_exhaustion_when_everything_is_pinned() {
    let store = TempStore::with_pool_frames(2);
    let path = store.path("raw.db");
    let disk = store.manager.disk();
    let pool = store.manager.pool();

    disk.create_file(&path).unwrap();
    let file = disk.open_file(&path).unwrap();

    let _a = pool.alloc_page(&file).unwrap();
    let _b = pool.alloc_page(&file).unwrap();
    assert!(matches!(
        pool.alloc_page(&file),
        Err(StorageError::PoolExhausted)
    ));
}

#[test]
fn test_two_pins_share_one_frame() {
    let store = TempStore::new();
    let path = store.path("raw.db");
    let disk = store.manager.disk();
    let pool = store.manager.pool();

    disk.create_file(&path).unwrap();
    let file = disk.open_file(&path).unwrap();
    let mut writer = pool.alloc_page(&file).unwrap();
    let reader = pool.read_page(&file, writer.page_no()).unwrap();

    writer.write()[0] = 0x5A;
    assert_eq!(reader.read()[0], 0x5A);
}

#[test]
fn test_same_path_opens_same_handle() {
    let store = TempStore::new();
    let path = store.path("raw.db");
    let disk = store.manager.disk();

    disk.create_file(&path).unwrap();
    let first = disk.open_file(&path).unwrap();
    let second = disk.open_file(&path).unwrap();
    assert_eq!(first.id(), second.id());
    assert!(std::sync::Arc::ptr_eq(&first, &second));
}
