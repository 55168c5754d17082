//! Log Module
//!
//! The single append-only file every record is written to.
//!
//! ## Responsibilities
//! - Hand out a byte offset for every append, before the bytes hit disk
//! - Buffer appends and flush them on a size or time threshold
//! - Random reads straight from the file, never from the buffer
//! - Tell callers whether an offset is still sitting in the buffer
//!
//! ## Offsets
//! ```text
//! 0                      flushed_len          flushed_len + buffered
//! ├──────── on disk ────────────┼──────── in buffer ───────┤
//!                               │                          │
//!                  read_at() cannot see these bytes ───────┘
//! ```
//!
//! A reader that holds an offset in the buffered range has to call
//! [`LogFile::flush`] before [`LogFile::read_at`].

mod file;

pub use file::LogFile;
