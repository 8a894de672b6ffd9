//! # Burrow - An Append-Only Log Key-Value Store
//!
//! Burrow is an embeddable persistent key-value store backed by a single
//! append-only log file, with an in-memory index for O(1) lookups and
//! optional per-key expiration.
//!
//! ## Architecture
//!
//! The storage engine consists of a few small components:
//!
//! - **Record codec**: fixed header + optional expiry + key +
//!   snappy-compressed value, with an MD5 digest over the compressed
//!   payload
//! - **Log store**: one append handle and one positioned-read handle over
//!   the same file; the write cursor always equals the file length
//! - **Index**: concurrent key-to-offset map, rebuilt by a full replay of
//!   the log at open
//! - **Store**: the `get`/`set`/`set_ex`/`delete`/`close` facade
//!
//! Updates and deletes never rewrite the log in place; they append new
//! records, and a zero-length value marks a tombstone. Space held by
//! superseded records is never reclaimed.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use burrow::{Options, Store};
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), burrow::Error> {
//! let store = Store::open("./data", Options::default())?;
//!
//! store.set("key1", b"value1")?;
//! store.set_ex("key2", b"value2", Duration::from_secs(60))?;
//!
//! let value = store.get("key1")?;
//! assert_eq!(value, b"value1");
//!
//! store.delete("key1")?;
//! store.close()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Module declarations
pub mod config;
pub mod error;
pub mod index;
pub mod logfile;
pub mod record;
pub mod server;

// Re-exports
pub use config::Options;
pub use error::{Error, Result};

use index::KeyIndex;
use logfile::{LogReader, LogWriter};
use parking_lot::Mutex;
use record::{Header, Kind, HEADER_SIZE};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The main store handle.
///
/// # Thread Safety
///
/// `Store` is designed to be shared across threads using `Arc<Store>`.
/// Writers (`set`/`set_ex`/`delete`) serialize through an internal lock
/// covering the append, the index update, and the cursor advance as one
/// critical section; readers (`get`) take no lock at all. Every operation
/// blocks the calling thread for the duration of its I/O.
///
/// Only one `Store` may be active against a given directory; opening two
/// concurrent instances over the same path is undefined.
pub struct Store {
    /// Store directory path
    path: PathBuf,

    /// Append handle plus write cursor, the single-writer critical section
    writer: Mutex<LogWriter>,

    /// Independent positioned-read handle over the same file
    reader: LogReader,

    /// Live key to record-offset mapping
    index: KeyIndex,
}

impl Store {
    /// Opens a store at the specified directory with the given options.
    ///
    /// Creates the directory if it doesn't exist (honoring
    /// `create_if_missing`), opens or creates the single data file inside
    /// it, and replays the whole log to rebuild the index and derive the
    /// write cursor. Replay cost is linear in the log size; every open
    /// pays the full scan.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory is inaccessible or the log
    /// contains malformed records.
    pub fn open<P: AsRef<Path>>(path: P, options: Options) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            if options.create_if_missing {
                std::fs::create_dir_all(&path)?;
            } else {
                return Err(Error::invalid_argument(format!(
                    "store directory does not exist: {:?}",
                    path
                )));
            }
        }

        let data_path = logfile::data_file_path(&path);
        if !data_path.exists() {
            File::create(&data_path)?;
        }

        let (index, cursor) = KeyIndex::rebuild(&data_path)?;
        let writer = LogWriter::open(&data_path, cursor, options.sync_writes)?;
        let reader = LogReader::open(&data_path)?;

        log::info!(
            "opened store at {:?}: {} live keys, {} log bytes",
            path,
            index.len(),
            cursor
        );

        Ok(Self { path, writer: Mutex::new(writer), reader, index })
    }

    /// Retrieves the value for `key`.
    ///
    /// Reads take no lock: an index lookup is followed by a positioned
    /// read at the stored offset. If the record there turns out to be a
    /// tombstone or has expired, the key is evicted from the index (lazy
    /// cleanup) and `KeyNotFound` is returned.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` if the key is absent, deleted, or expired;
    /// `Corruption` if the stored digest doesn't match the value payload.
    pub fn get(&self, key: &str) -> Result<Vec<u8>> {
        let offset = self.index.get(key).ok_or(Error::KeyNotFound)?;

        let mut header_bytes = [0u8; HEADER_SIZE];
        self.reader.read_at(&mut header_bytes, offset)?;
        let header = Header::decode(&header_bytes)?;

        let mut value_offset = offset + HEADER_SIZE as u64;
        let mut expires_at = None;
        if header.kind == Kind::WithExpiry {
            let mut expiry_bytes = [0u8; 8];
            self.reader.read_at(&mut expiry_bytes, value_offset)?;
            expires_at = Some(u64::from_le_bytes(expiry_bytes));
            value_offset += 8;
        }

        let expired = expires_at.is_some_and(|at| at <= record::now_millis());
        if header.is_tombstone() || expired {
            self.index.remove(key);
            return Err(Error::KeyNotFound);
        }

        value_offset += header.key_len as u64;
        let mut payload = vec![0u8; header.value_len as usize];
        self.reader.read_at(&mut payload, value_offset)?;

        record::decode_value(&header, &payload)
    }

    /// Inserts or overwrites `key` with `value`.
    ///
    /// Overwriting is a pure append: the prior record's bytes become
    /// unreachable garbage and are never reclaimed.
    ///
    /// # Errors
    ///
    /// Returns an error if the append fails; the index is left unchanged
    /// in that case.
    pub fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.append_and_index(record::Record::new(key, value, None))
    }

    /// Inserts or overwrites `key` with `value`, expiring after `ttl`.
    ///
    /// The record stores the absolute expiry (now + `ttl`) as a
    /// millisecond epoch. Expired keys are evicted lazily: replay drops
    /// them eagerly at open, but a live store only removes them when a
    /// `get` discovers the expiry.
    pub fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        self.append_and_index(record::Record::new(key, value, Some(ttl)))
    }

    /// Deletes `key` by appending a tombstone record.
    ///
    /// The key is removed from the index immediately; the tombstone makes
    /// the deletion survive a restart.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` if the key is not currently indexed.
    pub fn delete(&self, key: &str) -> Result<()> {
        if !self.index.contains(key) {
            return Err(Error::KeyNotFound);
        }

        let bytes = record::Record::tombstone(key).encode()?;
        let mut writer = self.writer.lock();
        writer.append(&bytes)?;
        self.index.remove(key);
        Ok(())
    }

    /// Snapshot of all currently indexed keys, in no particular order.
    ///
    /// A key whose TTL has passed but which has not been read since stays
    /// listed until a `get` evicts it.
    pub fn keys(&self) -> Vec<String> {
        self.index.keys()
    }

    /// Number of live index entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the store holds no live keys.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The store directory path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Closes the store.
    ///
    /// Syncs and releases the write handle, then releases the read
    /// handle. Both are released even if the sync fails; the first error
    /// encountered is surfaced.
    pub fn close(self) -> Result<()> {
        let mut writer = self.writer.into_inner();
        let result = writer.sync();
        drop(writer);
        drop(self.reader);

        log::info!("closed store at {:?}", self.path);
        result
    }

    /// Append an encoded record and publish its offset, as one critical
    /// section under the write lock. The index update is only visible
    /// after the bytes are in the file.
    fn append_and_index(&self, record: record::Record) -> Result<()> {
        let bytes = record.encode()?;
        let mut writer = self.writer.lock();
        let offset = writer.append(&bytes)?;
        self.index.insert(record.key, offset);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_store_open() {
        let dir = TempDir::new().unwrap();
        let result = Store::open(dir.path(), Options::default());
        assert!(result.is_ok());
    }

    #[test]
    fn test_open_missing_dir_not_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent");
        let result = Store::open(&path, Options::new().create_if_missing(false));
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_set_and_get() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path(), Options::default()).unwrap();

        store.set("key1", b"value1").unwrap();
        assert_eq!(store.get("key1").unwrap(), b"value1");

        assert!(matches!(store.get("key2"), Err(Error::KeyNotFound)));
    }

    #[test]
    fn test_overwrite() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path(), Options::default()).unwrap();

        store.set("key1", b"value1").unwrap();
        store.set("key1", b"value2").unwrap();
        assert_eq!(store.get("key1").unwrap(), b"value2");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delete() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path(), Options::default()).unwrap();

        store.set("key1", b"value1").unwrap();
        store.delete("key1").unwrap();
        assert!(matches!(store.get("key1"), Err(Error::KeyNotFound)));

        // A second delete finds nothing.
        assert!(matches!(store.delete("key1"), Err(Error::KeyNotFound)));
    }

    #[test]
    fn test_set_ex_expires_on_read() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path(), Options::default()).unwrap();

        store
            .set_ex("ephemeral", b"v", Duration::from_millis(1))
            .unwrap();
        std::thread::sleep(Duration::from_millis(20));

        assert!(matches!(store.get("ephemeral"), Err(Error::KeyNotFound)));
        // The failed read evicted the key.
        assert!(store.keys().is_empty());
    }

    #[test]
    fn test_set_ex_readable_before_expiry() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path(), Options::default()).unwrap();

        store
            .set_ex("session", b"token", Duration::from_secs(3600))
            .unwrap();
        assert_eq!(store.get("session").unwrap(), b"token");
    }

    #[test]
    fn test_keys() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path(), Options::default()).unwrap();

        store.set("a", b"1").unwrap();
        store.set("b", b"2").unwrap();
        store.set("c", b"3").unwrap();
        store.delete("b").unwrap();

        let mut keys = store.keys();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_empty_value_behaves_as_tombstone() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path(), Options::default()).unwrap();

        store.set("key1", b"").unwrap();
        assert!(matches!(store.get("key1"), Err(Error::KeyNotFound)));
    }

    #[test]
    fn test_close() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path(), Options::default()).unwrap();
        store.set("key1", b"value1").unwrap();
        assert!(store.close().is_ok());
    }

    #[test]
    fn test_reopen_preserves_data() {
        let dir = TempDir::new().unwrap();

        {
            let store = Store::open(dir.path(), Options::default()).unwrap();
            store.set("key1", b"value1").unwrap();
            store.close().unwrap();
        }

        let store = Store::open(dir.path(), Options::default()).unwrap();
        assert_eq!(store.get("key1").unwrap(), b"value1");
    }

    #[test]
    fn test_independent_instances() {
        let dir1 = TempDir::new().unwrap();
        let dir2 = TempDir::new().unwrap();

        let store1 = Store::open(dir1.path(), Options::default()).unwrap();
        let store2 = Store::open(dir2.path(), Options::default()).unwrap();

        store1.set("only-in-one", b"v").unwrap();
        assert!(matches!(store2.get("only-in-one"), Err(Error::KeyNotFound)));
        assert_eq!(store2.len(), 0);
    }
}
