//! Recovery tests: reopening a store must reconstruct exactly the state
//! an uninterrupted instance would hold, and damaged logs must surface
//! corruption instead of silently losing data.

use burrow::logfile;
use burrow::{Error, Options, Store};
use std::time::Duration;
use tempfile::TempDir;

fn reopen(dir: &TempDir) -> Store {
    Store::open(dir.path(), Options::default()).unwrap()
}

#[test]
fn test_reopen_replays_writes_and_deletes() {
    let dir = TempDir::new().unwrap();

    {
        let store = reopen(&dir);
        store.set("a", b"1").unwrap();
        store.set("b", b"2").unwrap();
        store.delete("a").unwrap();
        store.close().unwrap();
    }

    let store = reopen(&dir);
    assert!(matches!(store.get("a"), Err(Error::KeyNotFound)));
    assert_eq!(store.get("b").unwrap(), b"2");
    assert_eq!(store.len(), 1);
}

#[test]
fn test_reopen_resolves_overwrites_to_latest() {
    let dir = TempDir::new().unwrap();

    {
        let store = reopen(&dir);
        store.set("x", b"v1").unwrap();
        store.set("x", b"v2").unwrap();
        store.set("x", b"v3").unwrap();
        store.close().unwrap();
    }

    let store = reopen(&dir);
    assert_eq!(store.get("x").unwrap(), b"v3");
    assert_eq!(store.len(), 1);
}

#[test]
fn test_reopen_drops_expired_entries() {
    let dir = TempDir::new().unwrap();

    {
        let store = reopen(&dir);
        store.set("keep", b"v").unwrap();
        store
            .set_ex("gone", b"v", Duration::from_millis(10))
            .unwrap();
        store.close().unwrap();
    }
    std::thread::sleep(Duration::from_millis(50));

    // Replay evicts expired entries eagerly; no read is needed.
    let store = reopen(&dir);
    assert_eq!(store.keys(), vec!["keep".to_string()]);
}

#[test]
fn test_reopen_after_reopen_appends_correctly() {
    let dir = TempDir::new().unwrap();

    {
        let store = reopen(&dir);
        store.set("a", b"1").unwrap();
        store.close().unwrap();
    }
    {
        let store = reopen(&dir);
        store.set("b", b"2").unwrap();
        store.close().unwrap();
    }

    let store = reopen(&dir);
    assert_eq!(store.get("a").unwrap(), b"1");
    assert_eq!(store.get("b").unwrap(), b"2");
}

#[test]
fn test_flipped_value_byte_detected_on_read() {
    let dir = TempDir::new().unwrap();
    let store = reopen(&dir);
    store.set("k", b"an important value").unwrap();

    // Damage the last byte of the file, inside the value payload.
    let path = logfile::data_file_path(dir.path());
    let mut bytes = std::fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    std::fs::write(&path, &bytes).unwrap();

    assert!(matches!(store.get("k"), Err(Error::Corruption(_))));
}

#[test]
fn test_flipped_value_byte_fails_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = reopen(&dir);
        store.set("k", b"an important value").unwrap();
        store.close().unwrap();
    }

    let path = logfile::data_file_path(dir.path());
    let mut bytes = std::fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    std::fs::write(&path, &bytes).unwrap();

    let result = Store::open(dir.path(), Options::default());
    assert!(matches!(result, Err(Error::Corruption(_))));
}

#[test]
fn test_truncated_log_fails_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = reopen(&dir);
        store.set("k", b"a value that will get cut off").unwrap();
        store.close().unwrap();
    }

    let path = logfile::data_file_path(dir.path());
    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() - 5]).unwrap();

    let result = Store::open(dir.path(), Options::default());
    assert!(matches!(result, Err(Error::Corruption(_))));
}
