use std::path::Path;

use crate::storage::heap_file::HeapFile;
use crate::storage::storage_manager::StorageManager;
use crate::types::{
    error::{Result, StorageError},
    page::PageMut,
    rid::Rid,
    MAX_RECORD_SIZE,
};

/// Append cursor over a heap file. Records are placed on the tail page;
/// when the tail fills up, a fresh page is allocated and linked onto the
/// chain.
pub struct InsertFileScan {
    heap: HeapFile,
}

impl InsertFileScan {
    pub fn open(mgr: &StorageManager, path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            heap: HeapFile::open(mgr, path)?,
        })
    }

    pub fn rec_cnt(&self) -> i32 {
        self.heap.rec_cnt()
    }

    /// Inserts the record and returns its RID. Grows the page chain when
    /// the tail page has no room; the retry on the fresh page cannot run
    /// out of space because records are bounded by `MAX_RECORD_SIZE`.
    pub fn insert_record(&mut self, rec: &[u8]) -> Result<Rid> {
        if rec.len() > MAX_RECORD_SIZE {
            return Err(StorageError::InvalidRecordLength {
                length: rec.len(),
                max: MAX_RECORD_SIZE,
            });
        }

        let mut header = self.heap.header();
        let mut cur_page_no = header.last_page;

        let on_tail = self.heap.cur_page.as_ref().map(|pin| pin.page_no()) == Some(header.last_page);
        if !on_tail {
            self.heap.cur_page = None;
            self.heap.cur_page = Some(self.heap.pin_data_page(header.last_page)?);
        }

        let attempt = {
            let pin = match &mut self.heap.cur_page {
                Some(pin) => pin,
                None => return Err(StorageError::NoCurrentRecord),
            };
            let mut buf = pin.write();
            PageMut::new(&mut buf[..]).insert_record(rec)
        };

        let slot_no = match attempt {
            Ok(slot_no) => slot_no,
            Err(StorageError::PageFull { .. }) => {
                let mut new_pin = self.heap.pool.alloc_page(&self.heap.file)?;
                let new_page_no = new_pin.page_no();
                {
                    let mut buf = new_pin.write();
                    PageMut::new(&mut buf[..]).init();
                }

                // Link the fresh page from the old tail, then release the
                // old tail and adopt the new one as the current page.
                {
                    let pin = match &mut self.heap.cur_page {
                        Some(pin) => pin,
                        None => return Err(StorageError::NoCurrentRecord),
                    };
                    let mut buf = pin.write();
                    PageMut::new(&mut buf[..]).set_next_page(new_page_no);
                }
                self.heap.cur_page = Some(new_pin);
                cur_page_no = new_page_no;

                header.last_page = new_page_no;
                self.heap.write_header(&header);

                let pin = match &mut self.heap.cur_page {
                    Some(pin) => pin,
                    None => return Err(StorageError::NoCurrentRecord),
                };
                let mut buf = pin.write();
                PageMut::new(&mut buf[..]).insert_record(rec)?
            }
            Err(e) => return Err(e),
        };

        header.rec_cnt += 1;
        self.heap.write_header(&header);
        self.heap.cur_rec = Rid::new(cur_page_no, slot_no);
        Ok(self.heap.cur_rec)
    }
}

impl Drop for InsertFileScan {
    fn drop(&mut self) {
        // The held page is assumed mutated; make sure it goes back dirty.
        if let Some(pin) = &mut self.heap.cur_page {
            pin.mark_dirty();
        }
    }
}
