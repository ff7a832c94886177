use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::types::error::{Result, StorageError};

/// Comparison operators accepted by a scan predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompOp {
    LessThan,
    LessThanOrEqual,
    Equal,
    GreaterThanOrEqual,
    GreaterThan,
    NotEqual,
}

/// The typed value a record attribute is compared against. Strings are
/// fixed-width byte sequences, compared over exactly their length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterValue {
    Int(i32),
    Float(f32),
    Bytes(Vec<u8>),
}

impl FilterValue {
    /// Width of the attribute this value compares against.
    pub fn len(&self) -> usize {
        match self {
            FilterValue::Int(_) => 4,
            FilterValue::Float(_) => 4,
            FilterValue::Bytes(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A pushdown filter: compare `length` bytes at `offset` of each record
/// against `value` under `op`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanFilter {
    pub offset: usize,
    pub op: CompOp,
    pub value: FilterValue,
}

impl ScanFilter {
    pub fn new(offset: usize, op: CompOp, value: FilterValue) -> Result<Self> {
        let filter = Self { offset, op, value };
        filter.validate()?;
        Ok(filter)
    }

    pub fn validate(&self) -> Result<()> {
        if self.value.is_empty() {
            return Err(StorageError::BadScanParam {
                reason: "filter length must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Whether the record satisfies the predicate. A record too short to
    /// contain the attribute does not match; that is not an error.
    pub fn matches(&self, rec: &[u8]) -> bool {
        let length = self.value.len();
        if self.offset + length > rec.len() {
            return false;
        }
        let attr = &rec[self.offset..self.offset + length];

        let ordering = match &self.value {
            FilterValue::Int(value) => {
                let attr = i32::from_le_bytes([attr[0], attr[1], attr[2], attr[3]]);
                Some(attr.cmp(value))
            }
            FilterValue::Float(value) => {
                let attr = f32::from_le_bytes([attr[0], attr[1], attr[2], attr[3]]);
                attr.partial_cmp(value)
            }
            FilterValue::Bytes(bytes) => Some(attr.cmp(&bytes[..])),
        };

        match ordering {
            Some(ordering) => match self.op {
                CompOp::LessThan => ordering == Ordering::Less,
                CompOp::LessThanOrEqual => ordering != Ordering::Greater,
                CompOp::Equal => ordering == Ordering::Equal,
                CompOp::GreaterThanOrEqual => ordering != Ordering::Less,
                CompOp::GreaterThan => ordering == Ordering::Greater,
                CompOp::NotEqual => ordering != Ordering::Equal,
            },
            // NaN compares unequal to everything, including itself.
            None => self.op == CompOp::NotEqual,
        }
    }
}
