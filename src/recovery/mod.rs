//! Recovery Module
//!
//! Rebuilds the key directory by replaying the log from byte 0.
//!
//! ## Group Commit
//! Records only take effect once a commit marker follows them:
//! ```text
//!            ┌──────────────── Normal / Tombstone ───────────────┐
//!            ▼                                                   │
//!   Scanning ──► Accumulating (pending group grows) ─────────────┘
//!      ▲                │
//!      │              Commit
//!      │                ▼
//!      └──────── Apply group to key directory
//!
//!   end of input / torn record ──► Done   (pending group dropped)
//!   bad checksum / bad length  ──► Failed (hard error)
//! ```
//!
//! A torn record at the end is what a crash in the middle of an append
//! leaves behind; it is skipped without error. A record that was read in
//! full and still fails to decode means the log is corrupt, and recovery
//! refuses to produce a partially trusted directory. So does a record whose
//! declared length runs past the end of the log while a valid record still
//! follows it: only a damaged length field produces that.

mod scanner;

pub use scanner::{LogScanner, ScannedRecord};

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{EmberError, Result};
use crate::keydir::{KeyDir, KeyDirEntry};
use crate::record::Flag;

/// Result of a replay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryStats {
    /// Complete records read, commit markers included
    pub records_scanned: u64,

    /// Commit markers seen
    pub groups_committed: u64,

    /// Normal and tombstone records applied to the directory
    pub records_applied: u64,

    /// Complete records dropped because no commit marker followed them
    pub records_discarded: u64,

    /// Input ended in the middle of a record
    pub torn_tail: bool,

    /// Offset just past the last commit marker
    pub committed_len: u64,

    /// Offset just past the last complete record
    pub scanned_len: u64,
}

/// A record waiting for its group's commit marker
struct PendingRecord {
    key: String,
    flag: Flag,
    offset: u64,
    size: u32,
}

/// Log replay into a key directory
pub struct Recovery;

impl Recovery {
    /// Replay every committed group from `reader` into `keydir`
    ///
    /// `keydir` is not cleared first; entries from the log are layered over
    /// whatever it holds. On error the directory may hold some of the
    /// groups applied before the failure, and must not be used.
    pub fn replay<R: Read>(reader: R, header_size: u32, keydir: &KeyDir) -> Result<RecoveryStats> {
        let mut scanner = LogScanner::new(reader, header_size);
        let mut pending: Vec<PendingRecord> = Vec::new();
        let mut stats = RecoveryStats::default();

        while let Some(scanned) = scanner.next_record()? {
            stats.records_scanned += 1;
            let end = scanned.offset + scanned.size as u64;

            match scanned.record.flag {
                Flag::Commit => {
                    stats.groups_committed += 1;
                    stats.records_applied += pending.len() as u64;
                    apply_group(pending.drain(..), keydir);
                    stats.committed_len = end;
                }
                flag @ (Flag::Normal | Flag::Tombstone) => {
                    let key = String::from_utf8(scanned.record.key).map_err(|e| {
                        EmberError::Recovery {
                            offset: scanned.offset,
                            source: Box::new(EmberError::InvalidRecord(format!(
                                "key is not valid UTF-8: {}",
                                e
                            ))),
                        }
                    })?;
                    pending.push(PendingRecord {
                        key,
                        flag,
                        offset: scanned.offset,
                        size: scanned.size,
                    });
                }
            }
        }

        stats.records_discarded = pending.len() as u64;
        stats.torn_tail = scanner.torn_tail();
        stats.scanned_len = scanner.offset();

        if stats.torn_tail {
            warn!(
                offset = stats.scanned_len,
                "incomplete record at end of log, ignoring the tail"
            );
        }
        if stats.records_discarded > 0 {
            warn!(
                records = stats.records_discarded,
                "records without a trailing commit marker were discarded"
            );
        }

        Ok(stats)
    }

    /// Replay the log file at `path` into `keydir`
    ///
    /// A missing file is an empty log.
    pub fn replay_path(path: &Path, header_size: u32, keydir: &KeyDir) -> Result<RecoveryStats> {
        match File::open(path) {
            Ok(file) => Self::replay(BufReader::new(file), header_size, keydir),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RecoveryStats::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Check the log at `path` without touching any live directory
    ///
    /// Returns the stats a real replay would produce, or the error it would
    /// fail with.
    pub fn verify(path: &Path, header_size: u32) -> Result<RecoveryStats> {
        Self::replay_path(path, header_size, &KeyDir::new())
    }
}

fn apply_group(group: impl Iterator<Item = PendingRecord>, keydir: &KeyDir) {
    for pending in group {
        match pending.flag {
            Flag::Tombstone => {
                debug!(key = %pending.key, offset = pending.offset, "replaying tombstone");
                keydir.remove(&pending.key);
            }
            _ => {
                keydir.insert(pending.key, KeyDirEntry::new(pending.offset, pending.size));
            }
        }
    }
}
