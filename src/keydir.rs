//! Key directory
//!
//! In-memory map from every live key to where its latest record sits in the
//! log. Backed by [`DashMap`], so lookups, stores and removes from many
//! threads need no outer lock.
//!
//! A delete leaves a marker holding the tombstone's offset in place of the
//! entry. Every write to a key is compared against whatever the slot holds,
//! live or deleted, so the record appended last wins no matter which thread
//! reaches the map first. Markers live until the directory is rebuilt.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Location of the newest record for a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDirEntry {
    /// Log file holding the record. Only one file exists, so always 0.
    pub file_id: u32,

    /// Header + key + value bytes
    pub size: u32,

    /// Byte offset of the record start
    pub offset: u64,
}

impl KeyDirEntry {
    pub fn new(offset: u64, size: u32) -> Self {
        Self {
            file_id: 0,
            size,
            offset,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Live(KeyDirEntry),
    /// Deleted by the tombstone at this offset
    Deleted(u64),
}

impl Slot {
    fn offset(&self) -> u64 {
        match self {
            Slot::Live(entry) => entry.offset,
            Slot::Deleted(offset) => *offset,
        }
    }

    fn live(&self) -> Option<KeyDirEntry> {
        match self {
            Slot::Live(entry) => Some(*entry),
            Slot::Deleted(_) => None,
        }
    }
}

/// Concurrent key → [`KeyDirEntry`] map
#[derive(Debug, Default)]
pub struct KeyDir {
    entries: DashMap<String, Slot>,
}

impl KeyDir {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point `key` at `entry`
    ///
    /// The write that was appended last wins: if the slot already holds an
    /// entry or a delete at a higher offset, it is kept. Returns whether
    /// `entry` was stored.
    pub fn insert(&self, key: String, entry: KeyDirEntry) -> bool {
        match self.entries.entry(key) {
            Entry::Occupied(mut existing) => {
                if existing.get().offset() > entry.offset {
                    return false;
                }
                existing.insert(Slot::Live(entry));
                true
            }
            Entry::Vacant(slot) => {
                slot.insert(Slot::Live(entry));
                true
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<KeyDirEntry> {
        self.entries.get(key).and_then(|slot| slot.live())
    }

    /// Drop `key` outright, leaving no delete marker
    ///
    /// For single-threaded rebuilds, where no older write can still arrive.
    pub fn remove(&self, key: &str) -> Option<KeyDirEntry> {
        self.entries.remove(key).and_then(|(_, slot)| slot.live())
    }

    /// Record that the tombstone at `offset` deleted `key`
    ///
    /// Ignored if the slot already holds a write appended after `offset`.
    /// Otherwise returns the live entry that was deleted, if any.
    pub fn mark_deleted(&self, key: &str, offset: u64) -> Option<KeyDirEntry> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut existing) => {
                if existing.get().offset() > offset {
                    return None;
                }
                existing.insert(Slot::Deleted(offset)).live()
            }
            Entry::Vacant(slot) => {
                slot.insert(Slot::Deleted(offset));
                None
            }
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of live keys. Walks every shard.
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|slot| matches!(slot.value(), Slot::Live(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of delete markers held
    pub fn deleted_len(&self) -> usize {
        self.entries
            .iter()
            .filter(|slot| matches!(slot.value(), Slot::Deleted(_)))
            .count()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Snapshot of the live keys, in no particular order
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|slot| matches!(slot.value(), Slot::Live(_)))
            .map(|slot| slot.key().clone())
            .collect()
    }
}
