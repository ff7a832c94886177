use crate::types::{
    error::{Result, StorageError},
    PageId, FILE_NAME_SIZE, INVALID_PAGE_NO,
};

/*
 * File header page (always page 1):
 *   0..32   file name, zero-padded, truncated if longer
 *   32..36  first_page  i32 (-1 when the chain is empty)
 *   36..40  last_page   i32 (-1 when the chain is empty)
 *   40..44  rec_cnt     i32
 * The rest of the page stays zero.
 */

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub file_name: String,
    pub first_page: PageId,
    pub last_page: PageId,
    pub rec_cnt: i32,
}

impl FileHeader {
    pub fn new(file_name: &str) -> Self {
        Self {
            file_name: truncate_name(file_name),
            first_page: INVALID_PAGE_NO,
            last_page: INVALID_PAGE_NO,
            rec_cnt: 0,
        }
    }

    pub fn read_from(bytes: &[u8]) -> Self {
        let name_field = &bytes[..FILE_NAME_SIZE];
        let name_len = name_field
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(FILE_NAME_SIZE);
        let file_name = String::from_utf8_lossy(&name_field[..name_len]).into_owned();

        let first_page = i32::from_le_bytes([bytes[32], bytes[33], bytes[34], bytes[35]]);
        let last_page = i32::from_le_bytes([bytes[36], bytes[37], bytes[38], bytes[39]]);
        let rec_cnt = i32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]);

        Self {
            file_name,
            first_page,
            last_page,
            rec_cnt,
        }
    }

    pub fn write_to(&self, bytes: &mut [u8]) {
        bytes[..FILE_NAME_SIZE].fill(0);
        let name = truncate_name(&self.file_name);
        bytes[..name.len()].copy_from_slice(name.as_bytes());

        bytes[32..36].copy_from_slice(&self.first_page.to_le_bytes());
        bytes[36..40].copy_from_slice(&self.last_page.to_le_bytes());
        bytes[40..44].copy_from_slice(&self.rec_cnt.to_le_bytes());
    }

    /// Sanity check applied when a file is opened.
    pub fn validate(&self) -> Result<()> {
        let empty_first = self.first_page == INVALID_PAGE_NO;
        let empty_last = self.last_page == INVALID_PAGE_NO;
        if empty_first != empty_last {
            return Err(StorageError::InvalidHeader {
                reason: format!(
                    "first_page {} and last_page {} disagree about emptiness",
                    self.first_page, self.last_page
                ),
            });
        }
        if empty_first && self.rec_cnt != 0 {
            return Err(StorageError::InvalidHeader {
                reason: format!("empty chain with rec_cnt {}", self.rec_cnt),
            });
        }
        if self.rec_cnt < 0 {
            return Err(StorageError::InvalidHeader {
                reason: format!("negative rec_cnt {}", self.rec_cnt),
            });
        }
        Ok(())
    }
}

/// Keeps at most `FILE_NAME_SIZE - 1` bytes so the stored field stays
/// zero-terminated, cutting on a char boundary.
fn truncate_name(name: &str) -> String {
    let mut end = name.len().min(FILE_NAME_SIZE - 1);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].to_owned()
}
