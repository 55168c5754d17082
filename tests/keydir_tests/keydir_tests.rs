//! Tests for the Key Directory
//!
//! These tests verify:
//! - Basic insert/get/remove
//! - Last-appended-wins ordering by offset
//! - Delete markers ordered by offset
//! - Concurrent access from many threads

use emberkv::keydir::{KeyDir, KeyDirEntry};

// =============================================================================
// Basic Operations
// =============================================================================

#[test]
fn test_new_is_empty() {
    let keydir = KeyDir::new();
    assert!(keydir.is_empty());
    assert_eq!(keydir.len(), 0);
    assert!(keydir.get("missing").is_none());
}

#[test]
fn test_insert_and_get() {
    let keydir = KeyDir::new();
    assert!(keydir.insert("alpha".to_string(), KeyDirEntry::new(0, 30)));

    let entry = keydir.get("alpha").unwrap();
    assert_eq!(entry.offset, 0);
    assert_eq!(entry.size, 30);
    assert_eq!(entry.file_id, 0);
    assert!(keydir.contains_key("alpha"));
    assert_eq!(keydir.len(), 1);
}

#[test]
fn test_remove() {
    let keydir = KeyDir::new();
    keydir.insert("alpha".to_string(), KeyDirEntry::new(0, 30));

    assert_eq!(keydir.remove("alpha"), Some(KeyDirEntry::new(0, 30)));
    assert_eq!(keydir.remove("alpha"), None);
    assert!(keydir.is_empty());
}

#[test]
fn test_clear_and_keys() {
    let keydir = KeyDir::new();
    for (i, key) in ["a", "b", "c"].iter().enumerate() {
        keydir.insert(key.to_string(), KeyDirEntry::new(i as u64 * 50, 50));
    }

    let mut keys = keydir.keys();
    keys.sort();
    assert_eq!(keys, vec!["a", "b", "c"]);

    keydir.clear();
    assert!(keydir.is_empty());
    assert!(keydir.keys().is_empty());
}

// =============================================================================
// Ordering Tests
// =============================================================================

#[test]
fn test_newer_offset_replaces_older() {
    let keydir = KeyDir::new();
    keydir.insert("k".to_string(), KeyDirEntry::new(100, 25));

    assert!(keydir.insert("k".to_string(), KeyDirEntry::new(200, 27)));
    assert_eq!(keydir.get("k").unwrap().offset, 200);
    assert_eq!(keydir.get("k").unwrap().size, 27);
}

#[test]
fn test_older_offset_does_not_replace_newer() {
    let keydir = KeyDir::new();
    keydir.insert("k".to_string(), KeyDirEntry::new(200, 27));

    assert!(!keydir.insert("k".to_string(), KeyDirEntry::new(100, 25)));
    assert_eq!(keydir.get("k").unwrap().offset, 200);
}

#[test]
fn test_mark_deleted() {
    let keydir = KeyDir::new();
    keydir.insert("k".to_string(), KeyDirEntry::new(100, 25));

    // A tombstone appended before the live record leaves it alone
    assert!(keydir.mark_deleted("k", 50).is_none());
    assert!(keydir.contains_key("k"));

    // A tombstone appended after it deletes it
    assert_eq!(keydir.mark_deleted("k", 150).unwrap().offset, 100);
    assert!(!keydir.contains_key("k"));
    assert!(keydir.get("k").is_none());
    assert_eq!(keydir.len(), 0);
    assert!(keydir.is_empty());
    assert!(keydir.keys().is_empty());
    assert_eq!(keydir.deleted_len(), 1);

    assert!(keydir.mark_deleted("k", 500).is_none());
}

#[test]
fn test_late_insert_does_not_revive_deleted_key() {
    let keydir = KeyDir::new();
    keydir.insert("k".to_string(), KeyDirEntry::new(0, 25));

    // Put appended at 100, tombstone at 150, but the put reaches the map last
    keydir.mark_deleted("k", 150);
    assert!(!keydir.insert("k".to_string(), KeyDirEntry::new(100, 25)));
    assert!(!keydir.contains_key("k"));

    // A put appended after the tombstone brings the key back
    assert!(keydir.insert("k".to_string(), KeyDirEntry::new(200, 25)));
    assert_eq!(keydir.get("k").unwrap().offset, 200);
    assert_eq!(keydir.deleted_len(), 0);
}

#[test]
fn test_remove_leaves_no_marker() {
    let keydir = KeyDir::new();
    keydir.insert("k".to_string(), KeyDirEntry::new(100, 25));

    keydir.remove("k");

    assert_eq!(keydir.deleted_len(), 0);
    assert!(keydir.insert("k".to_string(), KeyDirEntry::new(50, 25)));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_inserts_distinct_keys() {
    let keydir = KeyDir::new();

    crossbeam::thread::scope(|s| {
        for t in 0..8u64 {
            let keydir = &keydir;
            s.spawn(move |_| {
                for i in 0..500u64 {
                    let key = format!("t{}_k{}", t, i);
                    keydir.insert(key, KeyDirEntry::new(t * 1_000_000 + i, 32));
                }
            });
        }
    })
    .unwrap();

    assert_eq!(keydir.len(), 8 * 500);
    assert_eq!(keydir.get("t3_k42").unwrap().offset, 3_000_042);
}

#[test]
fn test_concurrent_inserts_same_key_keep_highest_offset() {
    let keydir = KeyDir::new();

    crossbeam::thread::scope(|s| {
        for t in 0..8u64 {
            let keydir = &keydir;
            s.spawn(move |_| {
                // Offsets interleave across threads; order of arrival is random
                for i in 0..1000u64 {
                    keydir.insert("hot".to_string(), KeyDirEntry::new(i * 8 + t, 32));
                }
            });
        }
    })
    .unwrap();

    assert_eq!(keydir.len(), 1);
    assert_eq!(keydir.get("hot").unwrap().offset, 999 * 8 + 7);
}
