use std::path::Path;

use crate::executor::predicate::ScanFilter;
use crate::storage::heap_file::HeapFile;
use crate::storage::storage_manager::StorageManager;
use crate::types::{
    error::{Result, StorageError},
    page::{PageMut, PageView},
    rid::{Record, Rid},
    PageId, INVALID_PAGE_NO,
};

/// Forward cursor over a heap file's page chain, with optional filter
/// pushdown, mark/reset, and delete-at-cursor.
pub struct HeapFileScan {
    heap: HeapFile,
    filter: Option<ScanFilter>,
    mark: Option<(PageId, Rid)>,
}

impl HeapFileScan {
    pub fn open(mgr: &StorageManager, path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            heap: HeapFile::open(mgr, path)?,
            filter: None,
            mark: None,
        })
    }

    pub fn rec_cnt(&self) -> i32 {
        self.heap.rec_cnt()
    }

    /// Installs the filter for subsequent `scan_next` calls. `None`
    /// matches every record.
    pub fn start_scan(&mut self, filter: Option<ScanFilter>) -> Result<()> {
        if let Some(filter) = &filter {
            filter.validate()?;
        }
        self.filter = filter;
        Ok(())
    }

    /// Advances to the next matching record and returns its RID, or
    /// `None` at end of file. Pages are walked in chain order, slots in
    /// directory order; each slot is evaluated once.
    pub fn scan_next(&mut self) -> Result<Option<Rid>> {
        if self.heap.cur_page.is_none() {
            let first_page = self.heap.header().first_page;
            if first_page == INVALID_PAGE_NO {
                return Ok(None);
            }
            let pin = self.heap.pin_data_page(first_page)?;
            self.heap.cur_rec = Rid::before_first(first_page);
            self.heap.cur_page = Some(pin);
        }

        loop {
            let (slot_step, next_page) = {
                let pin = match &self.heap.cur_page {
                    Some(pin) => pin,
                    None => return Ok(None),
                };
                let buf = pin.read();
                let view = PageView::new(&buf[..]);
                let next_page = view.next_page();
                match view.next_slot(self.heap.cur_rec.slot_no) {
                    Some(slot_no) => {
                        let bytes = view.record_slice(slot_no)?;
                        let matched = match &self.filter {
                            Some(filter) => filter.matches(bytes),
                            None => true,
                        };
                        (Some((slot_no, matched)), next_page)
                    }
                    None => (None, next_page),
                }
            };

            match slot_step {
                Some((slot_no, matched)) => {
                    self.heap.cur_rec.slot_no = slot_no;
                    if matched {
                        return Ok(Some(self.heap.cur_rec));
                    }
                }
                None => {
                    // Page exhausted: release it and follow the chain. An
                    // empty page in the middle of the chain is walked
                    // through, not treated as end of file.
                    self.heap.cur_page = None;
                    if next_page == INVALID_PAGE_NO {
                        return Ok(None);
                    }
                    let pin = self.heap.pin_data_page(next_page)?;
                    self.heap.cur_rec = Rid::before_first(next_page);
                    self.heap.cur_page = Some(pin);
                }
            }
        }
    }

    /// The record under the cursor. The scan must be positioned on a
    /// record that still exists.
    pub fn get_record(&self) -> Result<Record> {
        let pin = match &self.heap.cur_page {
            Some(pin) => pin,
            None => return Err(StorageError::NoCurrentRecord),
        };
        let buf = pin.read();
        let view = PageView::new(&buf[..]);
        Ok(Record::new(
            view.record_slice(self.heap.cur_rec.slot_no)?.to_vec(),
        ))
    }

    /// Snapshots the cursor so `reset_scan` can return to it.
    pub fn mark_scan(&mut self) {
        let page_no = self
            .heap
            .cur_page
            .as_ref()
            .map(|pin| pin.page_no())
            .unwrap_or(INVALID_PAGE_NO);
        self.mark = Some((page_no, self.heap.cur_rec));
    }

    /// Restores the cursor to the marked position, repinning the marked
    /// page if the scan has moved off it.
    pub fn reset_scan(&mut self) -> Result<()> {
        let (page_no, rec) = self.mark.ok_or(StorageError::NoMark)?;
        let current = self.heap.cur_page.as_ref().map(|pin| pin.page_no());
        if current != Some(page_no) {
            self.heap.cur_page = None;
            if page_no != INVALID_PAGE_NO {
                let pin = self.heap.pin_data_page(page_no)?;
                self.heap.cur_page = Some(pin);
            }
        }
        self.heap.cur_rec = rec;
        Ok(())
    }

    /// Deletes the record under the cursor and decrements the file's
    /// record count. The cursor stays on the dead slot, so the next
    /// `scan_next` continues with its successor.
    pub fn delete_record(&mut self) -> Result<()> {
        let slot_no = self.heap.cur_rec.slot_no;
        {
            let pin = match &mut self.heap.cur_page {
                Some(pin) => pin,
                None => return Err(StorageError::NoCurrentRecord),
            };
            let mut buf = pin.write();
            PageMut::new(&mut buf[..]).delete_record(slot_no)?;
        }
        let mut header = self.heap.header();
        header.rec_cnt -= 1;
        self.heap.write_header(&header);
        Ok(())
    }

    /// Records that the current page was mutated through some side
    /// channel, so its frame is written back on release.
    pub fn mark_dirty(&mut self) {
        if let Some(pin) = &mut self.heap.cur_page {
            pin.mark_dirty();
        }
    }

    /// Releases the data-page pin and forgets the mark. Safe to call any
    /// number of times.
    pub fn end_scan(&mut self) {
        self.heap.cur_page = None;
        self.heap.cur_rec = Rid::invalid();
        self.mark = None;
    }
}

/// Adapter exposing a started scan as an iterator of `(rid, record)`
/// pairs.
pub struct ScanIterator {
    scan: HeapFileScan,
}

impl ScanIterator {
    pub fn new(scan: HeapFileScan) -> Self {
        Self { scan }
    }
}

impl Iterator for ScanIterator {
    type Item = Result<(Rid, Record)>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.scan.scan_next() {
            Ok(Some(rid)) => Some(self.scan.get_record().map(|rec| (rid, rec))),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
