//! Record codec
//!
//! Encoding and decoding of a single record.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{EmberError, Result};

use super::{Flag, Record, CHECKSUM_LEN, FLAG_POS, MAX_HEADER_SIZE, MIN_HEADER_SIZE};

/// The fixed-size prefix of a record, parsed without looking at the body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub checksum: u32,
    pub timestamp: u64,
    pub key_len: u32,
    pub value_len: u32,
    /// Raw flag byte; validated only once the checksum has been verified
    pub flag: u8,
}

impl RecordHeader {
    /// Parse the header at the start of `bytes`
    ///
    /// Fails with `ShortHeader` if fewer than `header_size` bytes are given.
    pub fn parse(bytes: &[u8], header_size: u32) -> Result<Self> {
        check_header_size(header_size)?;
        let header_size = header_size as usize;
        if bytes.len() < header_size {
            return Err(EmberError::ShortHeader {
                expected: header_size,
                actual: bytes.len(),
            });
        }

        let mut cursor = &bytes[..FLAG_POS];
        let checksum = cursor.get_u32_le();
        let timestamp = cursor.get_u64_le();
        let key_len = cursor.get_u32_le();
        let value_len = cursor.get_u32_le();

        Ok(Self {
            checksum,
            timestamp,
            key_len,
            value_len,
            flag: bytes[FLAG_POS],
        })
    }

    /// Length of key + value
    pub fn body_len(&self) -> u64 {
        self.key_len as u64 + self.value_len as u64
    }

    /// Length of the whole record this header describes
    pub fn record_len(&self, header_size: u32) -> u64 {
        header_size as u64 + self.body_len()
    }
}

impl Record {
    /// Encode to a fresh buffer
    ///
    /// Identical fields (timestamp included) always give identical bytes.
    pub fn encode(&self, header_size: u32) -> Result<Vec<u8>> {
        let mut buf = BytesMut::with_capacity(self.encoded_len(header_size));
        self.encode_into(&mut buf, header_size)?;
        Ok(buf.to_vec())
    }

    /// Append the encoded record to `buf`
    ///
    /// Several records can be packed into one buffer this way and handed to
    /// the log in a single append.
    pub fn encode_into(&self, buf: &mut BytesMut, header_size: u32) -> Result<()> {
        check_header_size(header_size)?;
        let key_len = u32::try_from(self.key.len()).map_err(|_| {
            EmberError::InvalidRecord(format!("key of {} bytes is too long", self.key.len()))
        })?;
        let value_len = u32::try_from(self.value.len()).map_err(|_| {
            EmberError::InvalidRecord(format!("value of {} bytes is too long", self.value.len()))
        })?;

        let start = buf.len();
        buf.reserve(self.encoded_len(header_size));

        // Checksum placeholder, patched once the rest is laid out
        buf.put_u32_le(0);
        buf.put_u64_le(self.timestamp);
        buf.put_u32_le(key_len);
        buf.put_u32_le(value_len);
        buf.put_u8(self.flag as u8);
        buf.put_bytes(0, (header_size - MIN_HEADER_SIZE) as usize);
        buf.put_slice(&self.key);
        buf.put_slice(&self.value);

        let crc = crc32fast::hash(&buf[start + CHECKSUM_LEN..]);
        buf[start..start + CHECKSUM_LEN].copy_from_slice(&crc.to_le_bytes());

        Ok(())
    }

    /// Decode one record from the start of `bytes`
    ///
    /// Trailing bytes past the record are ignored. The checksum is recomputed
    /// over exactly `header_size + key_len + value_len` bytes.
    pub fn decode(bytes: &[u8], header_size: u32) -> Result<Self> {
        let header = RecordHeader::parse(bytes, header_size)?;

        let record_len = header.record_len(header_size);
        if (bytes.len() as u64) < record_len {
            return Err(EmberError::ShortBody {
                expected: record_len as usize,
                actual: bytes.len(),
            });
        }
        let record_len = record_len as usize;

        let computed = crc32fast::hash(&bytes[CHECKSUM_LEN..record_len]);
        if computed != header.checksum {
            return Err(EmberError::ChecksumMismatch {
                stored: header.checksum,
                computed,
            });
        }

        let flag = Flag::try_from(header.flag)?;
        match flag {
            Flag::Tombstone if header.value_len != 0 => {
                return Err(EmberError::InvalidRecord(format!(
                    "tombstone carries a {} byte value",
                    header.value_len
                )));
            }
            Flag::Commit if header.key_len != 0 || header.value_len != 0 => {
                return Err(EmberError::InvalidRecord(
                    "commit marker carries a key or value".to_string(),
                ));
            }
            _ => {}
        }

        let key_start = header_size as usize;
        let value_start = key_start + header.key_len as usize;

        Ok(Self {
            timestamp: header.timestamp,
            flag,
            key: bytes[key_start..value_start].to_vec(),
            value: bytes[value_start..record_len].to_vec(),
        })
    }
}

fn check_header_size(header_size: u32) -> Result<()> {
    if !(MIN_HEADER_SIZE..=MAX_HEADER_SIZE).contains(&header_size) {
        return Err(EmberError::InvalidRecord(format!(
            "header size {} is outside {}..={}",
            header_size, MIN_HEADER_SIZE, MAX_HEADER_SIZE
        )));
    }
    Ok(())
}
