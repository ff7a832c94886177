use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::types::{
    error::{Result, StorageError},
    FileId, PageId, PAGE_SIZE,
};

/// One open database file. Page numbers are 1-based; page 1 sits at
/// offset 0. Positioned I/O keeps reads and writes independent of any
/// shared seek position.
#[derive(Debug)]
pub struct FileHandle {
    path: PathBuf,
    id: FileId,
    file: File,
    next_page: Mutex<PageId>,
}

impl FileHandle {
    pub fn id(&self) -> FileId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn page_offset(page_no: PageId) -> Result<u64> {
        if page_no < 1 {
            return Err(StorageError::InvalidPageNumber { page_no });
        }
        Ok((page_no as u64 - 1) * PAGE_SIZE as u64)
    }

    pub fn read_page(&self, page_no: PageId, buf: &mut [u8]) -> Result<()> {
        let offset = Self::page_offset(page_no)?;
        self.file.read_exact_at(buf, offset)?;
        Ok(())
    }

    pub fn write_page(&self, page_no: PageId, buf: &[u8]) -> Result<()> {
        let offset = Self::page_offset(page_no)?;
        self.file.write_all_at(buf, offset)?;
        Ok(())
    }

    /// Appends a zeroed page to the file and returns its page number.
    pub fn allocate_page(&self) -> Result<PageId> {
        let mut next = self.next_page.lock();
        let page_no = *next;
        self.write_page(page_no, &[0u8; PAGE_SIZE])?;
        *next += 1;
        Ok(page_no)
    }
}

struct FileEntry {
    id: FileId,
    handle: Weak<FileHandle>,
}

struct DiskInner {
    next_file_id: FileId,
    files: HashMap<PathBuf, FileEntry>,
}

/// Creates, opens and destroys database files. Opening the same path
/// twice hands back the same shared handle so that all users of a file
/// agree on its identity in the buffer pool.
pub struct DiskManager {
    inner: Mutex<DiskInner>,
}

impl DiskManager {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(DiskInner {
                next_file_id: 1,
                files: HashMap::new(),
            }),
        }
    }

    pub fn create_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if path.exists() {
            return Err(StorageError::FileExists {
                name: path.display().to_string(),
            });
        }
        OpenOptions::new().create_new(true).write(true).open(path)?;
        Ok(())
    }

    pub fn open_file(&self, path: impl AsRef<Path>) -> Result<Arc<FileHandle>> {
        let path = path.as_ref();
        let mut inner = self.inner.lock();

        if let Some(entry) = inner.files.get(path) {
            if let Some(handle) = entry.handle.upgrade() {
                return Ok(handle);
            }
        }

        if !path.exists() {
            return Err(StorageError::FileNotFound {
                name: path.display().to_string(),
            });
        }
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();

        // A file keeps its id across close/reopen so cached frames from a
        // previous handle still match.
        let known_id = inner.files.get(path).map(|entry| entry.id);
        let id = match known_id {
            Some(id) => id,
            None => {
                let id = inner.next_file_id;
                inner.next_file_id += 1;
                id
            }
        };
        let handle = Arc::new(FileHandle {
            path: path.to_path_buf(),
            id,
            file,
            next_page: Mutex::new((len / PAGE_SIZE as u64) as PageId + 1),
        });
        inner.files.insert(
            path.to_path_buf(),
            FileEntry {
                id,
                handle: Arc::downgrade(&handle),
            },
        );
        Ok(handle)
    }

    /// Removes the file from disk. Fails while any handle is still alive,
    /// including handles kept by cached buffer frames.
    pub fn destroy_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut inner = self.inner.lock();

        if let Some(entry) = inner.files.get(path) {
            if entry.handle.upgrade().is_some() {
                return Err(StorageError::FileBusy {
                    name: path.display().to_string(),
                });
            }
        }
        if !path.exists() {
            return Err(StorageError::FileNotFound {
                name: path.display().to_string(),
            });
        }
        inner.files.remove(path);
        fs::remove_file(path)?;
        Ok(())
    }

    /// The stable id assigned to a path, if it was ever opened.
    pub fn file_id(&self, path: impl AsRef<Path>) -> Option<FileId> {
        self.inner.lock().files.get(path.as_ref()).map(|e| e.id)
    }
}

impl Default for DiskManager {
    fn default() -> Self {
        Self::new()
    }
}
