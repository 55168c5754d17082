//! Log file
//!
//! Buffered appends, positional reads and the flush policy.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use bytes::{Buf, BytesMut};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{EmberError, Result};

/// Append-only log with a write buffer
///
/// Every operation takes the same lock, so an append can never interleave
/// with a flush or a read.
pub struct LogFile {
    path: PathBuf,

    /// Flush once this many bytes are buffered
    batch_size: usize,

    /// Flush once this much time passed since the last flush
    sync_interval: Duration,

    inner: Mutex<LogInner>,
}

struct LogInner {
    file: File,

    /// Appended bytes not yet written to `file`
    buffer: BytesMut,

    /// Bytes already written to `file`
    flushed_len: u64,

    last_flush: Instant,

    closed: bool,
}

impl LogFile {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    pub const FILE_NAME: &'static str = "active.log";

    /// Open or create `{data_dir}/active.log`
    ///
    /// Creates the data directory if it does not exist yet.
    pub fn open(config: &Config) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;
        let path = config.data_dir.join(Self::FILE_NAME);

        debug!(path = %path.display(), "opening log file");
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;
        let flushed_len = file.metadata()?.len();

        info!(path = %path.display(), size = flushed_len, "log file opened");

        Ok(Self {
            path,
            batch_size: config.batch_size,
            sync_interval: config.sync_interval(),
            inner: Mutex::new(LogInner {
                file,
                buffer: BytesMut::with_capacity(config.batch_size),
                flushed_len,
                last_flush: Instant::now(),
                closed: false,
            }),
        })
    }

    /// Append `data` and return the offset it starts at
    ///
    /// The offset is valid immediately, even though the bytes may still be
    /// buffered. Afterwards the buffer is flushed if it reached `batch_size`
    /// or if `sync_interval` elapsed since the last flush.
    ///
    /// If that flush fails before any of `data` reached the file, `data` is
    /// taken back out of the buffer. Once part of it was written it stays,
    /// and may be found again on the next open.
    pub fn append(&self, data: &[u8]) -> Result<u64> {
        let mut inner = self.inner.lock();

        let offset = inner.len();
        let previously_buffered = inner.buffer.len();
        inner.buffer.extend_from_slice(data);

        let since_flush = inner.last_flush.elapsed();
        if inner.buffer.len() >= self.batch_size || since_flush >= self.sync_interval {
            debug!(
                buffered = inner.buffer.len(),
                batch_size = self.batch_size,
                since_flush_ms = since_flush.as_millis() as u64,
                "flush threshold reached"
            );
            let flushed_before = inner.flushed_len;
            if let Err(e) = inner.flush_and_sync() {
                let written = (inner.flushed_len - flushed_before) as usize;
                if written <= previously_buffered {
                    let keep = inner.buffer.len() - data.len();
                    inner.buffer.truncate(keep);
                    warn!(offset, len = data.len(), error = %e, "append rolled back");
                }
                return Err(e);
            }
        }

        Ok(offset)
    }

    /// Read `size` bytes at `offset` straight from the file
    ///
    /// The write buffer is not consulted. A range past the end of the
    /// flushed data fails rather than returning padding.
    pub fn read_at(&self, offset: u64, size: u32) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock();

        let mut data = vec![0u8; size as usize];
        inner
            .file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| inner.file.read_exact(&mut data))
            .map_err(|source| EmberError::LogIo {
                op: "read",
                offset,
                source,
            })?;

        Ok(data)
    }

    /// True iff `offset` lies in the buffered, not yet flushed, range
    pub fn should_flush_before_read(&self, offset: u64) -> bool {
        let inner = self.inner.lock();
        offset >= inner.flushed_len && offset < inner.len()
    }

    /// Write out the buffer and fsync
    pub fn flush(&self) -> Result<()> {
        self.inner.lock().flush_and_sync()
    }

    /// Flush, then cut the file back to `len` bytes
    ///
    /// Only meant for dropping a torn or uncommitted tail found by recovery,
    /// before anything new is appended.
    pub fn truncate(&self, len: u64) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.flush_and_sync()?;
        if len >= inner.flushed_len {
            return Ok(());
        }

        let from = inner.flushed_len;
        inner
            .file
            .set_len(len)
            .and_then(|_| inner.file.sync_all())
            .map_err(|source| EmberError::LogIo {
                op: "truncate",
                offset: len,
                source,
            })?;
        inner.flushed_len = len;

        warn!(path = %self.path.display(), from, to = len, "log file truncated");
        Ok(())
    }

    /// A buffered reader over everything appended so far, from byte 0
    ///
    /// Flushes first so the reader sees the buffered tail as well.
    pub fn reader(&self) -> Result<BufReader<File>> {
        self.flush()?;
        Ok(BufReader::new(File::open(&self.path)?))
    }

    /// Flush, sync and close
    pub fn close(self) -> Result<()> {
        let mut inner = self.inner.lock();
        debug!(path = %self.path.display(), "closing log file");
        inner.flush_and_sync()?;
        inner.closed = true;
        info!(path = %self.path.display(), size = inner.flushed_len, "log file closed");
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Logical size: flushed plus buffered bytes
    pub fn len(&self) -> u64 {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn flushed_len(&self) -> u64 {
        self.inner.lock().flushed_len
    }

    pub fn buffered_len(&self) -> usize {
        self.inner.lock().buffer.len()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogInner {
    fn len(&self) -> u64 {
        self.flushed_len + self.buffer.len() as u64
    }

    fn flush_and_sync(&mut self) -> Result<()> {
        // Advance past every chunk the OS accepted, so a failed write leaves
        // `flushed_len` and the buffer consistent with what is on disk.
        while !self.buffer.is_empty() {
            match self.file.write(&self.buffer) {
                Ok(0) => {
                    return Err(EmberError::LogIo {
                        op: "write",
                        offset: self.flushed_len,
                        source: io::ErrorKind::WriteZero.into(),
                    });
                }
                Ok(n) => {
                    self.buffer.advance(n);
                    self.flushed_len += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(EmberError::LogIo {
                        op: "write",
                        offset: self.flushed_len,
                        source,
                    });
                }
            }
        }

        self.file.sync_all().map_err(|source| EmberError::LogIo {
            op: "sync",
            offset: self.flushed_len,
            source,
        })?;
        self.last_flush = Instant::now();

        debug!(flushed_len = self.flushed_len, "log buffer flushed and synced");
        Ok(())
    }
}

impl Drop for LogFile {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if inner.closed || inner.buffer.is_empty() {
            return;
        }
        if let Err(e) = inner.flush_and_sync() {
            warn!(path = %self.path.display(), error = %e, "failed to flush log file on drop");
        }
    }
}
