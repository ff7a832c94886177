use crc32fast::Hasher;

use crate::types::page::CHECKSUM_OFFSET;

/// CRC32 over a page image, skipping the checksum field itself.
pub fn page_checksum(page: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&page[..CHECKSUM_OFFSET]);
    hasher.update(&page[CHECKSUM_OFFSET + 4..]);
    hasher.finalize()
}
