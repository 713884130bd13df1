//! Tests for the block buffer pool
//!
//! These tests verify:
//! - Hits return the slot already holding a block
//! - Misses pick the next slot round-robin
//! - Scans larger than the pool miss on every access
//! - Dirty tracking

use nodestore::table::{Buffers, Locate};

// =============================================================================
// Helper Functions
// =============================================================================

/// Locate `block` and install it on a miss, like the table store does
fn access(buffers: &mut Buffers, block: usize) -> Locate {
    let result = buffers.locate(block);
    if let Locate::Miss(_) = result {
        buffers.current_mut().block = Some(block);
    }
    result
}

// =============================================================================
// Lookup Tests
// =============================================================================

#[test]
fn test_new_pool_is_clean() {
    let buffers = Buffers::new(4, 4096);
    assert_eq!(buffers.len(), 4);
    assert!(!buffers.has_dirty());
    assert_eq!(buffers.current().data.len(), 4096);
    assert_eq!(buffers.current().block, None);
}

#[test]
fn test_repeated_access_hits() {
    let mut buffers = Buffers::new(4, 64);
    assert!(matches!(access(&mut buffers, 3), Locate::Miss(_)));
    let slot = match buffers.locate(3) {
        Locate::Hit(slot) => slot,
        other => panic!("expected hit, got {:?}", other),
    };
    assert_eq!(buffers.locate(3), Locate::Hit(slot));
}

#[test]
fn test_working_set_within_pool_stays_cached() {
    let mut buffers = Buffers::new(4, 64);
    for block in 0..4 {
        access(&mut buffers, block);
    }
    for _ in 0..3 {
        for block in 0..4 {
            assert!(matches!(buffers.locate(block), Locate::Hit(_)));
        }
    }
}

#[test]
fn test_scan_larger_than_pool_thrashes() {
    let mut buffers = Buffers::new(4, 64);
    for block in 0..5 {
        access(&mut buffers, block);
    }
    // the round-robin victim of the 5th block was block 0
    assert!(matches!(access(&mut buffers, 0), Locate::Miss(_)));
}

#[test]
fn test_dirty_buffers_are_reported() {
    let mut buffers = Buffers::new(2, 64);
    access(&mut buffers, 1);
    buffers.current_mut().dirty = true;
    access(&mut buffers, 2);

    assert!(buffers.has_dirty());
    let dirty: Vec<Option<usize>> = buffers.dirty_mut().map(|b| b.block).collect();
    assert_eq!(dirty, vec![Some(1)]);
}
