//! Tests for ValueStore
//!
//! These tests verify:
//! - Round trips for values of zero, one and many windows
//! - Length prefixes that straddle a window boundary
//! - In-place overwrites with an unchanged encoded length
//! - Persistence across close/reopen
//! - Error reporting and read-only mode

use std::path::PathBuf;

use nodestore::{Config, StoreError, ValueAccess, ValueStore};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_values() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("text.val");
    (temp_dir, path)
}

/// 16-byte windows so short values already cross boundaries
fn small_windows() -> Config {
    Config::builder().window_size(16).build()
}

fn value(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

// =============================================================================
// Round Trips
// =============================================================================

#[test]
fn test_round_trip_lengths() {
    let (_temp, path) = setup_temp_values();
    let mut store = ValueStore::open(&path, small_windows()).unwrap();

    let lengths = [0usize, 1, 15, 16, 17, 63, 64, 100, 5000];
    let mut positions = Vec::new();
    for (i, &len) in lengths.iter().enumerate() {
        positions.push(store.append(&value(len, i as u8)).unwrap());
    }

    for (i, (&len, &pos)) in lengths.iter().zip(positions.iter()).enumerate() {
        let read = store.read(pos).unwrap();
        assert_eq!(read.len(), len);
        assert_eq!(read.as_ref(), value(len, i as u8).as_slice());
    }
}

#[test]
fn test_write_returns_next_position() {
    let (_temp, path) = setup_temp_values();
    let mut store = ValueStore::open(&path, Config::default()).unwrap();

    let next = store.write(0, b"hello").unwrap();
    assert_eq!(next, 6);
    let next = store.write(next, &value(100, 0)).unwrap();
    assert_eq!(next, 6 + 2 + 100);
    assert_eq!(store.len(), next);
}

#[test]
fn test_prefix_straddles_window() {
    let (_temp, path) = setup_temp_values();
    let mut store = ValueStore::open(&path, small_windows()).unwrap();

    store.write(0, &value(14, 1)).unwrap();
    assert_eq!(store.len(), 15);

    // a 2-byte length prefix starting at the last byte of the first window
    let long = value(70, 2);
    let pos = store.append(&long).unwrap();
    assert_eq!(pos, 15);
    assert_eq!(store.len(), 15 + 2 + 70);

    assert_eq!(store.read(15).unwrap().as_ref(), long.as_slice());
    assert_eq!(store.read(0).unwrap().as_ref(), value(14, 1).as_slice());
    assert_eq!(store.read_num(15).unwrap(), (70, 2));
}

#[test]
fn test_interleaved_writes_do_not_corrupt() {
    let (_temp, path) = setup_temp_values();
    let mut store = ValueStore::open(&path, small_windows()).unwrap();

    let mut written = Vec::new();
    for i in 0..50u8 {
        let v = value(i as usize * 3, i);
        let pos = store.append(&v).unwrap();
        written.push((pos, v));
        // jump back to an earlier entry between appends
        let (old_pos, old) = &written[i as usize / 2];
        assert_eq!(store.read(*old_pos).unwrap().as_ref(), old.as_slice());
    }
    for (pos, v) in &written {
        assert_eq!(store.read(*pos).unwrap().as_ref(), v.as_slice());
    }
}

#[test]
fn test_value_spanning_windows_survives_next_append() {
    let (_temp, path) = setup_temp_values();
    let mut store = ValueStore::open(&path, small_windows()).unwrap();

    let long: Vec<u8> = (1..=40).collect();
    let pos = store.append(&long).unwrap();
    store.append(b"x").unwrap();

    assert_eq!(store.read(pos).unwrap().as_ref(), long.as_slice());
    assert_eq!(store.read(41).unwrap().as_ref(), b"x");
}

#[test]
fn test_overwrite_with_same_length() {
    let (_temp, path) = setup_temp_values();
    let mut store = ValueStore::open(&path, small_windows()).unwrap();

    let a = store.append(b"first value").unwrap();
    let b = store.append(b"second").unwrap();
    store.write(a, b"FIRST VALUE").unwrap();

    assert_eq!(store.read(a).unwrap().as_ref(), b"FIRST VALUE");
    assert_eq!(store.read(b).unwrap().as_ref(), b"second");
}

#[test]
fn test_overwrite_with_different_length_is_rejected() {
    let (_temp, path) = setup_temp_values();
    let mut store = ValueStore::open(&path, small_windows()).unwrap();

    let a = store.append(b"short").unwrap();
    let b = store.append(b"neighbour").unwrap();
    assert!(matches!(
        store.write(a, b"much longer value"),
        Err(StoreError::InvalidInput(_))
    ));
    assert!(matches!(store.write(a, b"tiny"), Err(StoreError::InvalidInput(_))));

    assert_eq!(store.read(a).unwrap().as_ref(), b"short");
    assert_eq!(store.read(b).unwrap().as_ref(), b"neighbour");
    assert_eq!(store.len(), 6 + 10);
}

// =============================================================================
// Persistence
// =============================================================================

#[test]
fn test_reopen_reads_back() {
    let (_temp, path) = setup_temp_values();
    let mut positions = Vec::new();
    {
        let mut store = ValueStore::open(&path, small_windows()).unwrap();
        for i in 0..20u8 {
            positions.push(store.append(&value(i as usize * 11, i)).unwrap());
        }
        store.close().unwrap();
    }

    let expected_len: u64 = (0..20usize)
        .map(|i| nodestore::codec::token_len(i * 11) as u64)
        .sum();
    assert_eq!(std::fs::metadata(&path).unwrap().len(), expected_len);

    let mut store = ValueStore::open(&path, Config::default()).unwrap();
    assert_eq!(store.len(), expected_len);
    for (i, &pos) in positions.iter().enumerate() {
        assert_eq!(
            store.read(pos).unwrap().as_ref(),
            value(i * 11, i as u8).as_slice()
        );
    }
}

#[test]
fn test_spanning_value_is_persisted_byte_for_byte() {
    let (_temp, path) = setup_temp_values();
    let long = value(50, 3);
    {
        let mut store = ValueStore::open(&path, small_windows()).unwrap();
        assert_eq!(store.append(b"head").unwrap(), 0);
        assert_eq!(store.append(&long).unwrap(), 5);
        store.close().unwrap();
    }

    let mut expected = vec![4, b'h', b'e', b'a', b'd', 50];
    expected.extend_from_slice(&long);
    assert_eq!(std::fs::read(&path).unwrap(), expected);

    let mut store = ValueStore::open(&path, Config::builder().window_size(64).build()).unwrap();
    assert_eq!(store.read(0).unwrap().as_ref(), b"head");
    assert_eq!(store.read(5).unwrap().as_ref(), long.as_slice());
}

#[test]
fn test_drop_without_close_flushes() {
    let (_temp, path) = setup_temp_values();
    let pos = {
        let mut store = ValueStore::open(&path, Config::default()).unwrap();
        store.append(b"kept").unwrap()
    };
    let mut store = ValueStore::open(&path, Config::default()).unwrap();
    assert_eq!(store.read(pos).unwrap().as_ref(), b"kept");
}

// =============================================================================
// Error Handling
// =============================================================================

#[test]
fn test_read_past_end() {
    let (_temp, path) = setup_temp_values();
    let mut store = ValueStore::open(&path, Config::default()).unwrap();
    assert!(matches!(store.read(0), Err(StoreError::OutOfBounds { .. })));

    store.append(&value(10, 0)).unwrap();
    assert!(matches!(store.read_bytes(5, 10), Err(StoreError::OutOfBounds { .. })));
}

#[test]
fn test_read_only_rejects_writes() {
    let (_temp, path) = setup_temp_values();
    {
        let mut store = ValueStore::open(&path, Config::default()).unwrap();
        store.append(b"stable").unwrap();
        store.close().unwrap();
    }

    let config = Config::builder().read_only(true).build();
    let mut store = ValueStore::open(&path, config).unwrap();
    assert_eq!(store.read(0).unwrap().as_ref(), b"stable");
    assert!(matches!(store.write(0, b"other!"), Err(StoreError::Unsupported(_))));
    assert!(matches!(store.append(b"x"), Err(StoreError::Unsupported(_))));
    store.close().unwrap();
}

#[test]
fn test_shared_values() {
    let (_temp, path) = setup_temp_values();
    let shared = ValueStore::open(&path, small_windows()).unwrap().into_shared();
    let pos = shared.lock().append(b"shared").unwrap();
    assert_eq!(shared.lock().read(pos).unwrap().as_ref(), b"shared");
}
