//! Engine Module
//!
//! The storage engine that coordinates the log, the key directory and
//! recovery.
//!
//! ## Responsibilities
//! - Append every mutation to the log together with its commit marker
//! - Keep the key directory pointing at the newest record for each key
//! - Flush the log before reading a record that is still buffered
//! - Rebuild the key directory from the log on startup

use std::path::Path;

use bytes::BytesMut;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{EmberError, Result};
use crate::keydir::{KeyDir, KeyDirEntry};
use crate::log::LogFile;
use crate::recovery::{Recovery, RecoveryStats};
use crate::record::Record;
use crate::shell::Command;

/// The main storage engine
///
/// ## Concurrency Model
///
/// `get`, `put` and `delete` may be called from many threads at once
/// through a shared reference:
///
/// - **Log**: one internal mutex serializes append, read, flush and the
///   should-flush check. Nothing else is held while it is taken.
/// - **Key directory**: sharded map with its own per-shard locks; it never
///   shares a lock with the log.
///
/// There is no transaction spanning keys. Each put or delete is atomic on
/// its own because its record and commit marker go out in one append.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// The append-only record log
    log: LogFile,

    /// Live key → newest record location
    keydir: KeyDir,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Validate the config
    /// 2. Open/create the data directory and log file
    /// 3. Rebuild the key directory from the log
    /// 4. Ready to serve requests
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        info!(
            data_dir = %config.data_dir.display(),
            header_size = config.header_size,
            batch_size = config.batch_size,
            sync_interval_secs = config.sync_interval_secs,
            "opening engine"
        );

        let log = LogFile::open(&config)?;
        let engine = Self {
            config,
            log,
            keydir: KeyDir::new(),
        };

        engine.recover_key_dir()?;

        info!(keys = engine.keydir.len(), "engine ready");
        Ok(engine)
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Execute a command
    ///
    /// Routes shell commands to the matching operation
    pub fn execute(&self, command: Command) -> Result<Option<Vec<u8>>> {
        match command {
            Command::Get { key } => self.get(&key).map(Some),
            Command::Put { key, value } => {
                self.put(&key, value.as_bytes())?;
                Ok(None)
            }
            Command::Delete { key } => {
                self.delete(&key)?;
                Ok(None)
            }
        }
    }

    /// Get the value stored under `key`
    ///
    /// Fails with `KeyNotFound` if the key was never written or was deleted.
    pub fn get(&self, key: &str) -> Result<Vec<u8>> {
        let entry = self
            .keydir
            .get(key)
            .ok_or_else(|| EmberError::KeyNotFound(key.to_string()))?;

        debug!(key, offset = entry.offset, size = entry.size, "reading record");

        // The record may still be in the write buffer, which read_at skips.
        if self.log.should_flush_before_read(entry.offset) {
            debug!(key, offset = entry.offset, "record is buffered, flushing first");
            self.log.flush()?;
        }

        let bytes = self.log.read_at(entry.offset, entry.size)?;
        let record = Record::decode(&bytes, self.config.header_size)?;

        if record.key != key.as_bytes() {
            return Err(EmberError::InvalidRecord(format!(
                "record at offset {} belongs to another key",
                entry.offset
            )));
        }
        if record.is_tombstone() {
            debug!(key, "directory pointed at a tombstone");
            return Err(EmberError::KeyNotFound(key.to_string()));
        }

        Ok(record.value)
    }

    /// Store `value` under `key`, replacing any previous value
    ///
    /// Steps:
    /// 1. Encode the record and a commit marker into one buffer
    /// 2. Append both in a single call
    /// 3. Point the key directory at the record (never the marker)
    pub fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let record = Record::normal(key, value);
        let (offset, size) = self.append_committed(&record)?;

        self.keydir
            .insert(key.to_string(), KeyDirEntry::new(offset, size));

        debug!(
            key,
            offset,
            record_size = size,
            value_size = value.len(),
            timestamp = record.timestamp,
            "put"
        );
        Ok(())
    }

    /// Delete `key`
    ///
    /// Appends a tombstone with its own commit marker, so the delete
    /// survives a restart, then marks the key deleted in the directory.
    /// A put appended before the tombstone cannot bring the key back, even
    /// if its directory update lands later. Fails with `KeyNotFound` (and
    /// writes nothing) if the key is not live.
    pub fn delete(&self, key: &str) -> Result<()> {
        if !self.keydir.contains_key(key) {
            return Err(EmberError::KeyNotFound(key.to_string()));
        }

        let tombstone = Record::tombstone(key);
        let (offset, _) = self.append_committed(&tombstone)?;
        self.keydir.mark_deleted(key, offset);

        debug!(key, offset, "delete");
        Ok(())
    }

    /// Close the engine gracefully
    ///
    /// Flushes any buffered records and syncs the log to disk
    pub fn close(self) -> Result<()> {
        info!(keys = self.keydir.len(), "closing engine");
        self.log.close()
    }

    /// Number of live keys
    ///
    /// Walks the whole directory; meant for diagnostics and tests.
    pub fn key_dir_size(&self) -> usize {
        self.keydir.len()
    }

    /// Rebuild the key directory from the log
    ///
    /// Runs once inside [`Engine::open`]. Calling it again is allowed but
    /// must not overlap with writes: the directory is cleared and refilled,
    /// and a torn or uncommitted tail is cut off the file.
    pub fn recover_key_dir(&self) -> Result<RecoveryStats> {
        let reader = self.log.reader()?;

        self.keydir.clear();
        let stats = match Recovery::replay(reader, self.config.header_size, &self.keydir) {
            Ok(stats) => stats,
            Err(e) => {
                self.keydir.clear();
                return Err(e);
            }
        };

        // Cut back to the last commit so nothing appended from now on can
        // be glued onto a torn record or adopted by someone else's commit.
        if stats.torn_tail || stats.records_discarded > 0 {
            self.log.truncate(stats.committed_len)?;
        }

        info!(
            keys = self.keydir.len(),
            records_scanned = stats.records_scanned,
            groups_committed = stats.groups_committed,
            records_discarded = stats.records_discarded,
            torn_tail = stats.torn_tail,
            "key directory recovered"
        );
        Ok(stats)
    }

    /// Encode `record` plus a commit marker and append them as one unit
    ///
    /// Returns the record's offset and size.
    fn append_committed(&self, record: &Record) -> Result<(u64, u32)> {
        let header_size = self.config.header_size;
        let record_len = record.encoded_len(header_size);
        let size = u32::try_from(record_len).map_err(|_| {
            EmberError::InvalidRecord(format!("record of {} bytes is too large", record_len))
        })?;

        let mut buf = BytesMut::with_capacity(record_len + header_size as usize);
        record.encode_into(&mut buf, header_size)?;
        Record::commit()
            .with_timestamp(record.timestamp)
            .encode_into(&mut buf, header_size)?;

        let offset = self.log.append(&buf)?;
        Ok((offset, size))
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Whether `key` is live
    pub fn contains_key(&self, key: &str) -> bool {
        self.keydir.contains_key(key)
    }

    /// Snapshot of the live keys, in no particular order
    pub fn keys(&self) -> Vec<String> {
        self.keydir.keys()
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the log file path
    pub fn log_path(&self) -> &Path {
        self.log.path()
    }

    /// Logical size of the log, buffered bytes included
    pub fn log_len(&self) -> u64 {
        self.log.len()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
