use serde::{Deserialize, Serialize};

use crate::types::{
    error::{Result, StorageError},
    PageId, SlotId, BEFORE_FIRST_SLOT, DP_FIXED, INVALID_PAGE_NO, PAGE_SIZE, SLOT_ENTRY_SIZE,
};
use crate::utils::hash::page_checksum;

pub(crate) const CHECKSUM_OFFSET: usize = 8;

const DELETED_SLOT_LEN: i16 = -1;

/*
 * Data Page Layout (Slotted Page Structure)
 * ┌─────────────────────────────────────────────────────────────────┐
 * │                  FIXED HEADER (12 bytes)                        │
 * │  next_page(4) | slot_count(2) | free_ptr(2) | checksum(4)       │
 * ├─────────────────────────────────────────────────────────────────┤
 * │                  SLOT DIRECTORY                                 │
 * │  [slot0: offset(2)|len(2)] [slot1: offset(2)|len(2)] ...        │
 * ├─────────────────────────────────────────────────────────────────┤
 * │                  FREE SPACE                                     │
 * ├─────────────────────────────────────────────────────────────────┤
 * │                  RECORD BODIES                                  │
 * │  [...rec N...] [...rec 2...] [...rec 1...] [...rec 0...]        │
 * └─────────────────────────────────────────────────────────────────┘
 *
 * A slot with length -1 is deleted. Interior slots keep their index so
 * existing RIDs stay valid; only trailing deleted slots are reclaimed.
 */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotEntry {
    pub offset: u16,
    pub length: i16,
}

impl SlotEntry {
    pub fn deleted() -> Self {
        Self {
            offset: 0,
            length: DELETED_SLOT_LEN,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.length < 0
    }
}

/// Read-only decoder over one page-sized byte buffer.
pub struct PageView<'a> {
    data: &'a [u8],
}

impl<'a> PageView<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        debug_assert_eq!(data.len(), PAGE_SIZE);
        Self { data }
    }

    pub fn next_page(&self) -> PageId {
        i32::from_le_bytes([self.data[0], self.data[1], self.data[2], self.data[3]])
    }

    pub fn slot_count(&self) -> usize {
        u16::from_le_bytes([self.data[4], self.data[5]]) as usize
    }

    pub fn free_ptr(&self) -> usize {
        u16::from_le_bytes([self.data[6], self.data[7]]) as usize
    }

    pub fn stored_checksum(&self) -> u32 {
        u32::from_le_bytes([self.data[8], self.data[9], self.data[10], self.data[11]])
    }

    pub fn verify_checksum(&self) -> bool {
        self.stored_checksum() == page_checksum(self.data)
    }

    pub fn slot(&self, index: usize) -> SlotEntry {
        let base = DP_FIXED + index * SLOT_ENTRY_SIZE;
        SlotEntry {
            offset: u16::from_le_bytes([self.data[base], self.data[base + 1]]),
            length: i16::from_le_bytes([self.data[base + 2], self.data[base + 3]]),
        }
    }

    /// Number of live (non-deleted) slots.
    pub fn live_count(&self) -> usize {
        (0..self.slot_count())
            .filter(|&i| !self.slot(i).is_deleted())
            .count()
    }

    /// Total bytes held by live record bodies.
    pub fn live_bytes(&self) -> usize {
        (0..self.slot_count())
            .map(|i| self.slot(i))
            .filter(|s| !s.is_deleted())
            .map(|s| s.length as usize)
            .sum()
    }

    /// Contiguous gap between the slot directory and the record bodies.
    /// Space behind deleted bodies is only counted after compaction.
    pub fn free_space(&self) -> usize {
        self.free_ptr()
            .saturating_sub(DP_FIXED + self.slot_count() * SLOT_ENTRY_SIZE)
    }

    pub fn record_slice(&self, slot_no: SlotId) -> Result<&'a [u8]> {
        if slot_no < 0 || slot_no as usize >= self.slot_count() {
            return Err(StorageError::InvalidSlot { slot_no });
        }
        let slot = self.slot(slot_no as usize);
        if slot.is_deleted() {
            return Err(StorageError::InvalidSlot { slot_no });
        }
        let start = slot.offset as usize;
        let end = start + slot.length as usize;
        if start < DP_FIXED || end > self.data.len() {
            return Err(StorageError::InvalidSlot { slot_no });
        }
        Ok(&self.data[start..end])
    }

    /// Lowest live slot number, if the page has any records.
    pub fn first_slot(&self) -> Option<SlotId> {
        self.next_slot(BEFORE_FIRST_SLOT)
    }

    /// Next live slot strictly after `after`, in directory order. `after`
    /// may be -1 (before-first) or a slot that has since been deleted.
    pub fn next_slot(&self, after: SlotId) -> Option<SlotId> {
        let start = if after < 0 { 0 } else { after as usize + 1 };
        (start..self.slot_count())
            .find(|&i| !self.slot(i).is_deleted())
            .map(|i| i as SlotId)
    }
}

/// Mutable codec over one page-sized byte buffer.
pub struct PageMut<'a> {
    data: &'a mut [u8],
}

impl<'a> PageMut<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        debug_assert_eq!(data.len(), PAGE_SIZE);
        Self { data }
    }

    pub fn view(&self) -> PageView<'_> {
        PageView::new(self.data)
    }

    /// Formats a freshly allocated page: empty slot directory, no
    /// successor in the chain.
    pub fn init(&mut self) {
        self.set_next_page(INVALID_PAGE_NO);
        self.set_slot_count(0);
        self.set_free_ptr(PAGE_SIZE);
        self.update_checksum();
    }

    pub fn set_next_page(&mut self, page_no: PageId) {
        self.data[0..4].copy_from_slice(&page_no.to_le_bytes());
        self.update_checksum();
    }

    fn set_slot_count(&mut self, count: usize) {
        self.data[4..6].copy_from_slice(&(count as u16).to_le_bytes());
    }

    fn set_free_ptr(&mut self, offset: usize) {
        self.data[6..8].copy_from_slice(&(offset as u16).to_le_bytes());
    }

    fn set_slot(&mut self, index: usize, slot: SlotEntry) {
        let base = DP_FIXED + index * SLOT_ENTRY_SIZE;
        self.data[base..base + 2].copy_from_slice(&slot.offset.to_le_bytes());
        self.data[base + 2..base + 4].copy_from_slice(&slot.length.to_le_bytes());
    }

    pub fn update_checksum(&mut self) {
        let sum = page_checksum(self.data);
        self.data[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 4].copy_from_slice(&sum.to_le_bytes());
    }

    /// Places the record and returns the smallest available slot number,
    /// reusing a deleted slot before growing the directory. Fails with
    /// `PageFull` when the record and its slot entry cannot fit.
    pub fn insert_record(&mut self, rec: &[u8]) -> Result<SlotId> {
        let (slot_count, reuse, total_free, gap) = {
            let view = self.view();
            let slot_count = view.slot_count();
            let reuse = (0..slot_count).find(|&i| view.slot(i).is_deleted());
            let total_free = (PAGE_SIZE - DP_FIXED)
                .saturating_sub(slot_count * SLOT_ENTRY_SIZE + view.live_bytes());
            (slot_count, reuse, total_free, view.free_space())
        };
        let overhead = if reuse.is_none() { SLOT_ENTRY_SIZE } else { 0 };
        if rec.len() + overhead > total_free {
            return Err(StorageError::PageFull {
                needed: rec.len() + overhead,
                available: total_free,
            });
        }
        if rec.len() + overhead > gap {
            self.compact();
        }

        let offset = self.view().free_ptr() - rec.len();
        self.data[offset..offset + rec.len()].copy_from_slice(rec);
        self.set_free_ptr(offset);
        let slot_no = match reuse {
            Some(index) => index,
            None => {
                self.set_slot_count(slot_count + 1);
                slot_count
            }
        };
        self.set_slot(
            slot_no,
            SlotEntry {
                offset: offset as u16,
                length: rec.len() as i16,
            },
        );
        self.update_checksum();
        Ok(slot_no as SlotId)
    }

    /// Marks the slot deleted. The body is reclaimed lazily by the next
    /// compaction; the directory shrinks only from its tail.
    pub fn delete_record(&mut self, slot_no: SlotId) -> Result<()> {
        let slot_count = self.view().slot_count();
        if slot_no < 0 || slot_no as usize >= slot_count {
            return Err(StorageError::InvalidSlot { slot_no });
        }
        if self.view().slot(slot_no as usize).is_deleted() {
            return Err(StorageError::InvalidSlot { slot_no });
        }
        self.set_slot(slot_no as usize, SlotEntry::deleted());

        let mut count = slot_count;
        while count > 0 && self.view().slot(count - 1).is_deleted() {
            count -= 1;
        }
        self.set_slot_count(count);
        self.update_checksum();
        Ok(())
    }

    /// Repacks live record bodies against the end of the page,
    /// eliminating the gaps left by deleted records. Slot indices are
    /// preserved.
    pub fn compact(&mut self) {
        let slot_count = self.view().slot_count();
        let mut live: Vec<(usize, SlotEntry)> = (0..slot_count)
            .map(|i| (i, self.view().slot(i)))
            .filter(|(_, slot)| !slot.is_deleted())
            .collect();
        // Highest offset first: every body moves toward the end of the
        // page, past bodies that have already been placed.
        live.sort_by(|a, b| b.1.offset.cmp(&a.1.offset));

        let mut cursor = PAGE_SIZE;
        for (index, slot) in live {
            let len = slot.length as usize;
            cursor -= len;
            let src = slot.offset as usize;
            if src != cursor {
                self.data.copy_within(src..src + len, cursor);
            }
            self.set_slot(
                index,
                SlotEntry {
                    offset: cursor as u16,
                    length: slot.length,
                },
            );
        }

        let directory_end = DP_FIXED + slot_count * SLOT_ENTRY_SIZE;
        self.data[directory_end..cursor].fill(0);
        self.set_free_ptr(cursor);
        self.update_checksum();
    }
}
