//! Append-only log file primitives.
//!
//! The store keeps two independent handles over the single data file: an
//! append-only write handle owning the write cursor, and a positioned-read
//! handle used by lookups. Offsets published through the index only ever
//! address completed appends, so positioned reads never race the writer.

use crate::error::Result;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

/// Name of the single data file inside a store directory.
pub const DATA_FILE: &str = "burrow.data";

/// Full path of the data file inside `dir`.
pub fn data_file_path(dir: &Path) -> PathBuf {
    dir.join(DATA_FILE)
}

/// Append side of the log: a file handle in append mode plus the write
/// cursor tracking the next free offset.
///
/// Writes are unbuffered. Once `append` returns, the record's bytes are in
/// the file and its start offset is safe to publish to readers.
pub struct LogWriter {
    file: File,
    cursor: u64,
    sync_writes: bool,
}

impl LogWriter {
    /// Open (or create) the data file for appending.
    ///
    /// `cursor` must be the offset derived by replaying the log; it always
    /// equals the current file length. There is no persisted cursor
    /// metadata to trust.
    pub fn open(path: &Path, cursor: u64, sync_writes: bool) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file, cursor, sync_writes })
    }

    /// Append an encoded record, returning the offset it begins at.
    ///
    /// The cursor advances by exactly the record's on-disk size after a
    /// successful write; a failed write leaves it untouched.
    pub fn append(&mut self, bytes: &[u8]) -> Result<u64> {
        let offset = self.cursor;
        self.file.write_all(bytes)?;
        if self.sync_writes {
            self.file.sync_data()?;
        }
        self.cursor += bytes.len() as u64;
        Ok(offset)
    }

    /// The next free offset, equal to the current file length.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Flush file contents and metadata to persistent storage.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}

/// Read side of the log: an independent handle for positioned reads.
pub struct LogReader {
    file: File,
}

impl LogReader {
    /// Open the data file for reading.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self { file: File::open(path)? })
    }

    /// Read exactly `buf.len()` bytes starting at `offset`.
    ///
    /// Safe to call concurrently with appends: callers only ever pass
    /// offsets of fully appended, immutable records.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<()> {
        self.file.read_exact_at(buf, offset)?;
        Ok(())
    }
}
