pub mod error;
pub mod page;
pub mod rid;

// Common type aliases. Page and slot numbers are signed so that -1 can
// serve as the "no page" / "before first record" sentinel in RIDs and
// chain links.
pub type PageId = i32;
pub type SlotId = i32;
pub type FileId = u64;

pub const PAGE_SIZE: usize = 4096;
pub const DP_FIXED: usize = 12; // next_page(4) + slot_count(2) + free_ptr(2) + checksum(4)
pub const SLOT_ENTRY_SIZE: usize = 4; // offset (2 bytes) + length (2 bytes)

// An empty page must hold the record body plus its slot entry, so this
// bound guarantees that inserting into a freshly allocated page succeeds.
pub const MAX_RECORD_SIZE: usize = PAGE_SIZE - DP_FIXED - SLOT_ENTRY_SIZE;

pub const HEADER_PAGE_NO: PageId = 1;
pub const INVALID_PAGE_NO: PageId = -1;
pub const BEFORE_FIRST_SLOT: SlotId = -1;

pub const FILE_NAME_SIZE: usize = 32;
pub const FILE_HEADER_SIZE: usize = FILE_NAME_SIZE + 12;

pub const DEFAULT_POOL_FRAMES: usize = 64;
