//! Record Module
//!
//! One log entry and its binary encoding.
//!
//! ## Responsibilities
//! - Lay out header, key and value in a single contiguous buffer
//! - CRC32 checksums for corruption detection
//! - Tombstones for deletes, commit markers for group boundaries
//!
//! ## Record Format
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │ Header (header_size bytes, 21 by default)                         │
//! │ ┌─────────┬───────────────┬────────────┬────────────┬──────────┐  │
//! │ │ CRC (4) │ Timestamp (8) │ KeyLen (4) │ ValLen (4) │ Flag (1) │  │
//! │ └─────────┴───────────────┴────────────┴────────────┴──────────┘  │
//! │ [zero padding up to header_size]                                  │
//! ├───────────────────────────────────────────────────────────────────┤
//! │ Key (KeyLen bytes)                                                │
//! ├───────────────────────────────────────────────────────────────────┤
//! │ Value (ValLen bytes)                                              │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian. The CRC covers every byte after itself,
//! padding included.

mod codec;

pub use codec::RecordHeader;

use crate::error::EmberError;

/// Smallest header that still fits every field
pub const MIN_HEADER_SIZE: u32 = 21;

/// Largest header accepted
pub const MAX_HEADER_SIZE: u32 = 4096;

/// Byte ranges of the header fields
pub(crate) const CHECKSUM_LEN: usize = 4;
pub(crate) const FLAG_POS: usize = 20;

/// What a record means to the key directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Flag {
    /// A live key-value pair
    Normal = 0,

    /// The key was deleted; value is always empty
    Tombstone = 1,

    /// Group boundary; key and value are always empty
    Commit = 2,
}

impl TryFrom<u8> for Flag {
    type Error = EmberError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0 => Ok(Flag::Normal),
            1 => Ok(Flag::Tombstone),
            2 => Ok(Flag::Commit),
            other => Err(EmberError::InvalidRecord(format!("unknown flag {}", other))),
        }
    }
}

/// A single entry in the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Seconds since the Unix epoch when the record was created
    pub timestamp: u64,

    pub flag: Flag,

    pub key: Vec<u8>,

    /// Empty for tombstones and commit markers
    pub value: Vec<u8>,
}

impl Record {
    /// A live key-value pair stamped with the current time
    pub fn normal(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            timestamp: now_secs(),
            flag: Flag::Normal,
            key: key.into(),
            value: value.into(),
        }
    }

    /// A delete marker for `key`
    pub fn tombstone(key: impl Into<Vec<u8>>) -> Self {
        Self {
            timestamp: now_secs(),
            flag: Flag::Tombstone,
            key: key.into(),
            value: Vec::new(),
        }
    }

    /// A zero-length group boundary
    pub fn commit() -> Self {
        Self {
            timestamp: now_secs(),
            flag: Flag::Commit,
            key: Vec::new(),
            value: Vec::new(),
        }
    }

    /// Replace the timestamp, mostly so encodings are reproducible
    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Bytes this record occupies on disk: header + key + value
    pub fn encoded_len(&self, header_size: u32) -> usize {
        header_size as usize + self.key.len() + self.value.len()
    }

    pub fn is_tombstone(&self) -> bool {
        self.flag == Flag::Tombstone
    }

    pub fn is_commit(&self) -> bool {
        self.flag == Flag::Commit
    }
}

fn now_secs() -> u64 {
    // Clocks set before 1970 are clamped to zero.
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}
