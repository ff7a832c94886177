use std::path::Path;
use std::sync::Arc;

use crate::storage::buffer_pool::{BufferPool, PinnedPage};
use crate::storage::disk_manager::{DiskManager, FileHandle};
use crate::storage::header::FileHeader;
use crate::storage::storage_manager::StorageManager;
use crate::types::{
    error::{Result, StorageError},
    page::{PageMut, PageView},
    rid::{Record, Rid},
    PageId, HEADER_PAGE_NO, INVALID_PAGE_NO,
};

/// Creates a heap file: page 1 becomes the header page, followed by one
/// empty data page that starts the chain. Both pages are flushed before
/// the routine returns.
pub fn create_heap_file(
    disk: &Arc<DiskManager>,
    pool: &BufferPool,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    disk.create_file(path)?;
    let file = disk.open_file(path)?;

    let mut hdr_page = pool.alloc_page(&file)?;
    let mut data_page = pool.alloc_page(&file)?;
    {
        let mut buf = data_page.write();
        PageMut::new(&mut buf[..]).init();
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mut header = FileHeader::new(&name);
    header.first_page = data_page.page_no();
    header.last_page = data_page.page_no();
    {
        let mut buf = hdr_page.write();
        header.write_to(&mut buf[..]);
    }

    drop(data_page);
    drop(hdr_page);
    pool.flush_file(&file)?;
    Ok(())
}

/// Removes a heap file from disk, dropping any frames the pool still
/// caches for it. Fails while the file is open.
pub fn destroy_heap_file(
    disk: &Arc<DiskManager>,
    pool: &BufferPool,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    if let Some(file_id) = disk.file_id(path) {
        pool.discard_file(file_id)?;
    }
    disk.destroy_file(path)
}

/// An open heap file: the pinned header page, at most one pinned data
/// page, and the cursor position on it. Scan and insert cursors embed
/// this state and inherit its pin discipline.
pub struct HeapFile {
    // Field order is drop order: the data pin is released before the
    // header pin, the file handle last.
    pub(crate) cur_page: Option<PinnedPage>,
    pub(crate) cur_rec: Rid,
    hdr_page: PinnedPage,
    pub(crate) file: Arc<FileHandle>,
    pub(crate) pool: BufferPool,
}

impl HeapFile {
    /// Opens the file, pins its header page, and pins the first data
    /// page positioned before its first record.
    pub fn open(mgr: &StorageManager, path: impl AsRef<Path>) -> Result<Self> {
        let file = mgr.disk().open_file(path)?;
        let hdr_page = mgr.pool().read_page(&file, HEADER_PAGE_NO)?;
        let header = FileHeader::read_from(&hdr_page.read()[..]);
        header.validate()?;

        let mut heap = HeapFile {
            cur_page: None,
            cur_rec: Rid::invalid(),
            hdr_page,
            file,
            pool: mgr.pool().clone(),
        };
        if header.first_page != INVALID_PAGE_NO {
            let pin = heap.pin_data_page(header.first_page)?;
            heap.cur_rec = Rid::before_first(header.first_page);
            heap.cur_page = Some(pin);
        }
        Ok(heap)
    }

    /// Total live records, as tracked by the header page.
    pub fn rec_cnt(&self) -> i32 {
        self.header().rec_cnt
    }

    /// The name recorded in the file header at creation.
    pub fn file_name(&self) -> String {
        self.header().file_name
    }

    /// Fetches an arbitrary record. If the record is not on the
    /// currently pinned page, that page is released (carrying its dirty
    /// flag) and the target page is pinned in its place.
    pub fn get_record(&mut self, rid: Rid) -> Result<Record> {
        let on_current = self.cur_page.as_ref().map(|p| p.page_no()) == Some(rid.page_no);
        if !on_current {
            self.cur_page = None;
            self.cur_page = Some(self.pin_data_page(rid.page_no)?);
        }
        self.cur_rec = rid;

        let pin = match &self.cur_page {
            Some(pin) => pin,
            None => return Err(StorageError::NoCurrentRecord),
        };
        let buf = pin.read();
        let view = PageView::new(&buf[..]);
        Ok(Record::new(view.record_slice(rid.slot_no)?.to_vec()))
    }

    pub(crate) fn header(&self) -> FileHeader {
        FileHeader::read_from(&self.hdr_page.read()[..])
    }

    pub(crate) fn write_header(&mut self, header: &FileHeader) {
        header.write_to(&mut self.hdr_page.write()[..]);
    }

    /// Pins a data page and verifies its checksum before handing it out.
    pub(crate) fn pin_data_page(&self, page_no: PageId) -> Result<PinnedPage> {
        let pin = self.pool.read_page(&self.file, page_no)?;
        {
            let buf = pin.read();
            if !PageView::new(&buf[..]).verify_checksum() {
                return Err(StorageError::CorruptedPage {
                    page_no,
                    reason: "checksum mismatch".to_string(),
                });
            }
        }
        Ok(pin)
    }
}

impl Drop for HeapFile {
    fn drop(&mut self) {
        // Pins release themselves; unpin failures are logged by the
        // guards since a destructor has no way to report them.
        log::debug!("closing heap file {}", self.file.path().display());
    }
}
