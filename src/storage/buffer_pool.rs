use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::storage::disk_manager::FileHandle;
use crate::types::{
    error::{Result, StorageError},
    FileId, PageId, INVALID_PAGE_NO, PAGE_SIZE,
};

/// Shared view of one frame's bytes. Handed out by the pool while the
/// frame is pinned; two pins of the same page see the same buffer.
pub type PagePtr = Arc<RwLock<Box<[u8]>>>;

struct Frame {
    data: PagePtr,
    file: Option<Arc<FileHandle>>,
    page_no: PageId,
    pin_count: u32,
    dirty: bool,
    referenced: bool,
}

impl Frame {
    fn empty() -> Self {
        Self {
            data: Arc::new(RwLock::new(vec![0u8; PAGE_SIZE].into_boxed_slice())),
            file: None,
            page_no: INVALID_PAGE_NO,
            pin_count: 0,
            dirty: false,
            referenced: false,
        }
    }
}

struct PoolInner {
    frames: Vec<Frame>,
    page_table: HashMap<(FileId, PageId), usize>,
    clock_hand: usize,
}

struct PoolShared {
    inner: Mutex<PoolInner>,
}

/// Page cache with a fixed frame count and clock replacement. Pages are
/// handed out pinned; a frame with a nonzero pin count is never evicted.
/// Dirty frames are written back on eviction, on flush, and when the
/// last handle to the pool is dropped.
///
/// The pool itself is a cheap handle; clones share the same frames.
#[derive(Clone)]
pub struct BufferPool {
    shared: Arc<PoolShared>,
}

impl BufferPool {
    pub fn new(frame_count: usize) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                inner: Mutex::new(PoolInner {
                    frames: (0..frame_count).map(|_| Frame::empty()).collect(),
                    page_table: HashMap::new(),
                    clock_hand: 0,
                }),
            }),
        }
    }

    /// Pins the page, reading it from disk on a cache miss.
    pub fn read_page(&self, file: &Arc<FileHandle>, page_no: PageId) -> Result<PinnedPage> {
        let mut guard = self.shared.inner.lock();
        let inner = &mut *guard;

        if let Some(&index) = inner.page_table.get(&(file.id(), page_no)) {
            let frame = &mut inner.frames[index];
            frame.pin_count += 1;
            frame.referenced = true;
            return Ok(self.pinned(file, page_no, frame.data.clone()));
        }

        let index = Self::find_victim(inner)?;
        Self::evict_frame(inner, index)?;
        {
            let frame = &inner.frames[index];
            let mut buf = frame.data.write();
            file.read_page(page_no, &mut buf[..])?;
        }
        Self::adopt_frame(inner, index, file, page_no);
        Ok(self.pinned(file, page_no, inner.frames[index].data.clone()))
    }

    /// Allocates a fresh page at the end of the file and pins it. The
    /// frame starts zeroed, matching the on-disk image.
    pub fn alloc_page(&self, file: &Arc<FileHandle>) -> Result<PinnedPage> {
        let page_no = file.allocate_page()?;
        let mut guard = self.shared.inner.lock();
        let inner = &mut *guard;

        let index = Self::find_victim(inner)?;
        Self::evict_frame(inner, index)?;
        inner.frames[index].data.write().fill(0);
        Self::adopt_frame(inner, index, file, page_no);
        Ok(self.pinned(file, page_no, inner.frames[index].data.clone()))
    }

    /// Releases one pin, folding the caller's dirty flag into the frame.
    pub fn unpin_page(&self, file_id: FileId, page_no: PageId, dirty: bool) -> Result<()> {
        let mut guard = self.shared.inner.lock();
        let inner = &mut *guard;

        let index = *inner
            .page_table
            .get(&(file_id, page_no))
            .ok_or(StorageError::PageNotPinned { page_no })?;
        let frame = &mut inner.frames[index];
        if frame.pin_count == 0 {
            return Err(StorageError::PageNotPinned { page_no });
        }
        frame.pin_count -= 1;
        frame.dirty |= dirty;
        Ok(())
    }

    /// Writes back every dirty cached page of the file.
    pub fn flush_file(&self, file: &FileHandle) -> Result<()> {
        let mut guard = self.shared.inner.lock();
        for frame in &mut guard.frames {
            if let Some(frame_file) = &frame.file {
                if frame_file.id() == file.id() && frame.dirty {
                    frame_file.write_page(frame.page_no, &frame.data.read()[..])?;
                    frame.dirty = false;
                }
            }
        }
        Ok(())
    }

    /// Writes back every dirty page in the pool.
    pub fn flush_all(&self) -> Result<()> {
        let mut guard = self.shared.inner.lock();
        for frame in &mut guard.frames {
            if let Some(file) = &frame.file {
                if frame.dirty {
                    file.write_page(frame.page_no, &frame.data.read()[..])?;
                    frame.dirty = false;
                }
            }
        }
        Ok(())
    }

    /// Drops every cached frame of a file without writing it back, ahead
    /// of file destruction. Fails if any of them is still pinned.
    pub fn discard_file(&self, file_id: FileId) -> Result<()> {
        let mut guard = self.shared.inner.lock();
        let inner = &mut *guard;

        for frame in &inner.frames {
            if let Some(file) = &frame.file {
                if file.id() == file_id && frame.pin_count > 0 {
                    return Err(StorageError::FileBusy {
                        name: file.path().display().to_string(),
                    });
                }
            }
        }
        for frame in &mut inner.frames {
            if frame.file.as_ref().map(|f| f.id()) == Some(file_id) {
                inner.page_table.remove(&(file_id, frame.page_no));
                frame.file = None;
                frame.page_no = INVALID_PAGE_NO;
                frame.dirty = false;
                frame.referenced = false;
            }
        }
        Ok(())
    }

    /// Current pin count of a cached page, if the page is resident.
    pub fn pin_count(&self, file_id: FileId, page_no: PageId) -> Option<u32> {
        let guard = self.shared.inner.lock();
        guard
            .page_table
            .get(&(file_id, page_no))
            .map(|&index| guard.frames[index].pin_count)
    }

    fn pinned(&self, file: &Arc<FileHandle>, page_no: PageId, data: PagePtr) -> PinnedPage {
        PinnedPage {
            pool: self.clone(),
            file: Arc::clone(file),
            page_no,
            data,
            dirty: false,
        }
    }

    /// Clock sweep: skip pinned frames, give referenced frames a second
    /// chance, take the first remaining candidate.
    fn find_victim(inner: &mut PoolInner) -> Result<usize> {
        let frame_count = inner.frames.len();
        for _ in 0..2 * frame_count {
            let index = inner.clock_hand;
            inner.clock_hand = (inner.clock_hand + 1) % frame_count;
            let frame = &mut inner.frames[index];
            if frame.pin_count > 0 {
                continue;
            }
            if frame.referenced {
                frame.referenced = false;
                continue;
            }
            return Ok(index);
        }
        Err(StorageError::PoolExhausted)
    }

    fn evict_frame(inner: &mut PoolInner, index: usize) -> Result<()> {
        let frame = &mut inner.frames[index];
        if let Some(file) = &frame.file {
            if frame.dirty {
                file.write_page(frame.page_no, &frame.data.read()[..])?;
            }
        }
        if let Some(file) = frame.file.take() {
            inner.page_table.remove(&(file.id(), frame.page_no));
        }
        frame.page_no = INVALID_PAGE_NO;
        frame.dirty = false;
        Ok(())
    }

    fn adopt_frame(inner: &mut PoolInner, index: usize, file: &Arc<FileHandle>, page_no: PageId) {
        let frame = &mut inner.frames[index];
        frame.file = Some(Arc::clone(file));
        frame.page_no = page_no;
        frame.pin_count = 1;
        frame.dirty = false;
        frame.referenced = true;
        inner.page_table.insert((file.id(), page_no), index);
    }
}

impl Drop for PoolShared {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        for frame in &mut inner.frames {
            if let Some(file) = &frame.file {
                if frame.dirty {
                    if let Err(e) = file.write_page(frame.page_no, &frame.data.read()[..]) {
                        log::warn!(
                            "failed to flush page {} of {}: {}",
                            frame.page_no,
                            file.path().display(),
                            e
                        );
                    }
                }
            }
        }
    }
}

/// A pin paired with its dirty flag. Mutable access marks the pin dirty;
/// dropping the guard releases the pin and hands the accumulated dirty
/// flag to the pool.
pub struct PinnedPage {
    pool: BufferPool,
    file: Arc<FileHandle>,
    page_no: PageId,
    data: PagePtr,
    dirty: bool,
}

impl PinnedPage {
    pub fn page_no(&self) -> PageId {
        self.page_no
    }

    pub fn file_id(&self) -> FileId {
        self.file.id()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Box<[u8]>> {
        self.data.read()
    }

    pub fn write(&mut self) -> RwLockWriteGuard<'_, Box<[u8]>> {
        self.dirty = true;
        self.data.write()
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

impl Drop for PinnedPage {
    fn drop(&mut self) {
        if let Err(e) = self
            .pool
            .unpin_page(self.file.id(), self.page_no, self.dirty)
        {
            log::warn!("unpin of page {} failed: {}", self.page_no, e);
        }
    }
}
