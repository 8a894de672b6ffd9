//! In-memory key index and log replay.
//!
//! The index maps every live key to the start offset of its most recent
//! valid record. Reads are lock-free and may run concurrently with
//! writer-side mutation; the store only publishes an entry after its
//! backing record has been appended, so an indexed offset never points
//! past the end of the file.
//!
//! There is no persisted index or snapshot. The whole mapping is
//! discarded and rebuilt by a full linear scan of the log on every open.

use crate::error::Result;
use crate::record::{self, Record};
use crossbeam_skiplist::SkipMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Concurrent mapping from key to log offset.
pub struct KeyIndex {
    map: SkipMap<String, u64>,
}

impl KeyIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self { map: SkipMap::new() }
    }

    /// Offset of the most recent valid record for `key`, if indexed.
    pub fn get(&self, key: &str) -> Option<u64> {
        self.map.get(key).map(|entry| *entry.value())
    }

    /// Insert or overwrite the entry for `key`.
    pub fn insert(&self, key: String, offset: u64) {
        self.map.insert(key, offset);
    }

    /// Remove the entry for `key`, returning whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.map.remove(key).is_some()
    }

    /// Whether `key` is currently indexed.
    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Snapshot of all currently indexed keys, in no particular order
    /// from the caller's perspective.
    pub fn keys(&self) -> Vec<String> {
        self.map.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of indexed keys.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the index holds no keys.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Rebuild the index by replaying the log at `path` from offset 0.
    ///
    /// Returns the index together with the derived write cursor. Each
    /// decoded record advances the cursor by its full on-disk size even
    /// when it is a tombstone or already expired, since invalid records
    /// still occupy physical space; invalid records additionally remove
    /// their key, handling an earlier write superseded by its own
    /// tombstone or expired successor. Valid records index the offset the
    /// record began at, not the post-record cursor.
    ///
    /// A clean end-of-file stops the scan; any other decode failure
    /// aborts the open as corruption.
    pub fn rebuild(path: &Path) -> Result<(Self, u64)> {
        let index = Self::new();
        let mut cursor = 0u64;
        let mut reader = BufReader::new(File::open(path)?);
        let now = record::now_millis();

        while let Some(record) = Record::read_from(&mut reader)? {
            let size = record.size();
            if record.is_valid(now) {
                index.insert(record.key, cursor);
            } else {
                index.remove(&record.key);
            }
            cursor += size;
        }

        log::debug!("replayed {} log bytes, {} live keys", cursor, index.len());
        Ok((index, cursor))
    }
}

impl Default for KeyIndex {
    fn default() -> Self {
        Self::new()
    }
}
