use thiserror::Error;

use crate::types::{PageId, SlotId};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file '{name}' already exists")]
    FileExists { name: String },

    #[error("file '{name}' not found")]
    FileNotFound { name: String },

    #[error("file '{name}' is still open or cached")]
    FileBusy { name: String },

    #[error("page has no space for {needed} bytes ({available} free)")]
    PageFull { needed: usize, available: usize },

    #[error("invalid slot number {slot_no}")]
    InvalidSlot { slot_no: SlotId },

    #[error("record of {length} bytes exceeds the page capacity of {max}")]
    InvalidRecordLength { length: usize, max: usize },

    #[error("bad scan parameter: {reason}")]
    BadScanParam { reason: String },

    #[error("scan has no current record")]
    NoCurrentRecord,

    #[error("reset requested but the scan was never marked")]
    NoMark,

    #[error("invalid page number {page_no}")]
    InvalidPageNumber { page_no: PageId },

    #[error("all buffer pool frames are pinned")]
    PoolExhausted,

    #[error("page {page_no} is not pinned")]
    PageNotPinned { page_no: PageId },

    #[error("corrupted page {page_no}: {reason}")]
    CorruptedPage { page_no: PageId, reason: String },

    #[error("invalid file header: {reason}")]
    InvalidHeader { reason: String },
}

pub type Result<T> = std::result::Result<T, StorageError>;
