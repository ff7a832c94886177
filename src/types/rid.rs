use serde::{Deserialize, Serialize};

use crate::types::{PageId, SlotId, BEFORE_FIRST_SLOT, INVALID_PAGE_NO};

/// Identifies one record: the page it lives on and its slot number.
/// `slot_no == -1` means "before the first record on `page_no`".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rid {
    pub page_no: PageId,
    pub slot_no: SlotId,
}

impl Rid {
    pub fn new(page_no: PageId, slot_no: SlotId) -> Self {
        Self { page_no, slot_no }
    }

    /// Cursor position before the first record of a page.
    pub fn before_first(page_no: PageId) -> Self {
        Self {
            page_no,
            slot_no: BEFORE_FIRST_SLOT,
        }
    }

    pub fn invalid() -> Self {
        Self {
            page_no: INVALID_PAGE_NO,
            slot_no: BEFORE_FIRST_SLOT,
        }
    }
}

/// An opaque record payload, copied out of the pinned page that held it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub data: Vec<u8>,
}

impl Record {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl AsRef<[u8]> for Record {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
