use std::fs;

use gudang::{
    executor::{insert::InsertFileScan, scan::HeapFileScan},
    storage::heap_file::HeapFile,
    types::{error::StorageError, DP_FIXED, MAX_RECORD_SIZE, PAGE_SIZE},
    utils::mock::TempStore,
};

fn sample_record(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| seed.wrapping_add(i as u8)).collect()
}

#[test]
fn test_insert_then_read_back() {
    let store = TempStore::new();
    let path = store.create_file("ins.db");

    let rec = sample_record(50, 11);
    let rid = {
        let mut insert = InsertFileScan::open(&store.manager, &path).unwrap();
        let rid = insert.insert_record(&rec).unwrap();
        assert_eq!(insert.rec_cnt(), 1);
        rid
    };

    let mut heap = HeapFile::open(&store.manager, &path).unwrap();
    let fetched = heap.get_record(rid).unwrap();
    assert_eq!(fetched.len(), 50);
    assert_eq!(fetched.data, rec);
}

#[test]
fn test_record_length_limits() {
    let store = TempStore::new();
    let path = store.create_file("ins.db");
    let mut insert = InsertFileScan::open(&store.manager, &path).unwrap();

    let too_big = sample_record(MAX_RECORD_SIZE + 1, 1);
    assert!(matches!(
        insert.insert_record(&too_big),
        Err(StorageError::InvalidRecordLength { length, max })
            if length == MAX_RECORD_SIZE + 1 && max == MAX_RECORD_SIZE
    ));

    // the maximum-size record exactly fills one empty page
    let just_fits = sample_record(MAX_RECORD_SIZE, 2);
    insert.insert_record(&just_fits).unwrap();
    assert_eq!(insert.rec_cnt(), 1);
}

#[test]
fn test_overflow_allocates_and_links_new_pages() {
    let store = TempStore::new();
    let path = store.create_file("ins.db");

    // each record fills more than half a page, so every insert after the
    // first must grow the chain
    let half_plus = (PAGE_SIZE - DP_FIXED) / 2 + 1;
    let mut rids = Vec::new();
    {
        let mut insert = InsertFileScan::open(&store.manager, &path).unwrap();
        for seed in 1u8..=3 {
            rids.push(insert.insert_record(&sample_record(half_plus, seed)).unwrap());
        }
        assert_eq!(insert.rec_cnt(), 3);
    }
    store.manager.flush().unwrap();

    // header + the initial data page + two allocated tail pages
    let len = fs::metadata(&path).unwrap().len();
    assert_eq!(len, 4 * PAGE_SIZE as u64);

    let pages: Vec<_> = rids.iter().map(|rid| rid.page_no).collect();
    assert_eq!(pages, vec![2, 3, 4]);

    // the chain walk visits every record in insertion order
    let mut scan = HeapFileScan::open(&store.manager, &path).unwrap();
    scan.start_scan(None).unwrap();
    let mut seen = Vec::new();
    while let Some(rid) = scan.scan_next().unwrap() {
        seen.push(rid);
    }
    assert_eq!(seen, rids);
}

#[test]
fn test_many_inserts_span_many_pages() {
    let store = TempStore::new();
    let path = store.create_file("ins.db");

    let total = 300;
    let mut rids = Vec::new();
    {
        let mut insert = InsertFileScan::open(&store.manager, &path).unwrap();
        for i in 0..total {
            let mut rec = (i as i32).to_le_bytes().to_vec();
            rec.resize(100, 0xCD);
            rids.push(insert.insert_record(&rec).unwrap());
        }
        assert_eq!(insert.rec_cnt(), total);
    }

    let distinct_pages: std::collections::HashSet<_> =
        rids.iter().map(|rid| rid.page_no).collect();
    assert!(distinct_pages.len() > 1, "expected the chain to grow");

    let mut scan = HeapFileScan::open(&store.manager, &path).unwrap();
    scan.start_scan(None).unwrap();
    let mut count = 0;
    while let Some(rid) = scan.scan_next().unwrap() {
        assert_eq!(rid, rids[count as usize]);
        let rec = scan.get_record().unwrap();
        assert_eq!(&rec.data[..4], &(count as i32).to_le_bytes());
        count += 1;
    }
    assert_eq!(count, total);
}

#[test]
fn test_insert_reuses_slot_freed_on_the_tail() {
    let store = TempStore::new();
    let path = store.create_file("ins.db");

    let mut insert = InsertFileScan::open(&store.manager, &path).unwrap();
    let mut rids = Vec::new();
    for seed in 1u8..=3 {
        rids.push(insert.insert_record(&sample_record(40, seed)).unwrap());
    }

    // delete the newest record through a scan cursor
    {
        let mut scan = HeapFileScan::open(&store.manager, &path).unwrap();
        scan.start_scan(None).unwrap();
        while let Some(rid) = scan.scan_next().unwrap() {
            if rid == rids[2] {
                scan.delete_record().unwrap();
                break;
            }
        }
    }
    assert_eq!(insert.rec_cnt(), 2);

    // the freed tail slot is handed out again
    let rid = insert.insert_record(&sample_record(40, 9)).unwrap();
    assert_eq!(rid, rids[2]);
    assert_eq!(insert.rec_cnt(), 3);
}

#[test]
fn test_rec_cnt_tracks_inserts_and_deletes() {
    let store = TempStore::new();
    let path = store.create_file("ins.db");

    {
        let mut insert = InsertFileScan::open(&store.manager, &path).unwrap();
        for seed in 0u8..10 {
            insert.insert_record(&sample_record(25, seed)).unwrap();
        }
    }

    let mut scan = HeapFileScan::open(&store.manager, &path).unwrap();
    scan.start_scan(None).unwrap();
    let mut deleted = 0;
    while scan.scan_next().unwrap().is_some() {
        if deleted < 4 {
            scan.delete_record().unwrap();
            deleted += 1;
        }
    }
    assert_eq!(scan.rec_cnt(), 6);
}
