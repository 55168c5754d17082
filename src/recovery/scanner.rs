//! Log scanner
//!
//! Reads records one at a time from the start of a log, tracking offsets.

use std::io::{self, Read};

use tracing::debug;

use crate::error::{EmberError, Result};
use crate::record::{Record, RecordHeader};

/// A record read back from the log together with its position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedRecord {
    pub record: Record,

    /// Byte offset of the record start
    pub offset: u64,

    /// Header + key + value bytes
    pub size: u32,
}

/// Sequential reader over encoded records
///
/// Stops quietly when the input ends, including in the middle of a record.
/// A record that was read in full but does not decode is an error, and so
/// is an incomplete record followed by a valid one.
pub struct LogScanner<R: Read> {
    reader: R,
    header_size: u32,
    /// Offset of the next record to read
    offset: u64,
    /// Input ended part way through a record
    torn_tail: bool,
    done: bool,
}

impl<R: Read> LogScanner<R> {
    pub fn new(reader: R, header_size: u32) -> Self {
        Self {
            reader,
            header_size,
            offset: 0,
            torn_tail: false,
            done: false,
        }
    }

    /// Read the next record
    ///
    /// Returns `Ok(None)` at the end of input. If the input ended mid-record
    /// [`torn_tail`](Self::torn_tail) reports it afterwards.
    pub fn next_record(&mut self) -> Result<Option<ScannedRecord>> {
        if self.done {
            return Ok(None);
        }

        let mut bytes = vec![0u8; self.header_size as usize];
        let read = read_full(&mut self.reader, &mut bytes)?;
        if read < bytes.len() {
            self.finish(read > 0);
            return Ok(None);
        }

        let header = match RecordHeader::parse(&bytes, self.header_size) {
            Ok(header) => header,
            Err(e) => return Err(self.fail(e)),
        };

        // Grow with the data actually present rather than trusting the
        // declared length up front.
        let body_len = header.body_len();
        let read = (&mut self.reader).take(body_len).read_to_end(&mut bytes)?;
        if (read as u64) < body_len {
            // A crash only tears the last append, so nothing decodable can
            // follow the torn record. If something does, the length field
            // itself is damaged.
            if let Some(next) = find_record(&bytes[1..], self.header_size) {
                debug!(
                    offset = self.offset,
                    next_record = self.offset + 1 + next as u64,
                    "declared length runs past a valid record"
                );
                let expected =
                    usize::try_from(header.record_len(self.header_size)).unwrap_or(usize::MAX);
                return Err(self.fail(EmberError::ShortBody {
                    expected,
                    actual: bytes.len(),
                }));
            }
            self.finish(true);
            return Ok(None);
        }

        let size = match u32::try_from(header.record_len(self.header_size)) {
            Ok(size) => size,
            Err(_) => {
                return Err(self.fail(EmberError::InvalidRecord(format!(
                    "record of {} bytes does not fit a directory entry",
                    header.record_len(self.header_size)
                ))));
            }
        };

        let record = match Record::decode(&bytes, self.header_size) {
            Ok(record) => record,
            Err(e) => return Err(self.fail(e)),
        };

        let offset = self.offset;
        self.offset += size as u64;
        Ok(Some(ScannedRecord {
            record,
            offset,
            size,
        }))
    }

    /// Offset just past the last record returned
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Whether scanning stopped on an incomplete record
    pub fn torn_tail(&self) -> bool {
        self.torn_tail
    }

    fn finish(&mut self, torn: bool) {
        self.torn_tail = torn;
        self.done = true;
    }

    fn fail(&mut self, source: EmberError) -> EmberError {
        self.done = true;
        EmberError::Recovery {
            offset: self.offset,
            source: Box::new(source),
        }
    }
}

impl<R: Read> Iterator for LogScanner<R> {
    type Item = Result<ScannedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// Like `read_exact`, but reports how much was read instead of failing at EOF
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Offset of the first complete, checksum-valid record in `bytes`
fn find_record(bytes: &[u8], header_size: u32) -> Option<usize> {
    (0..bytes.len()).find(|&start| Record::decode(&bytes[start..], header_size).is_ok())
}
