//! Tests for the codec
//!
//! These tests verify:
//! - Compressed integer round trips at every width boundary
//! - Width selection from the first byte alone
//! - Streaming decode of concatenated integers
//! - Byte-string round trips

use nodestore::codec::{
    decode_num, decode_token, encode_num, num_len, num_width, put_num, put_token, NUM_MARKER,
};
use nodestore::StoreError;

// =============================================================================
// Round Trips
// =============================================================================

#[test]
fn test_round_trip_boundary_values() {
    let values = [0, 0x3F, 0x40, 0x3FFF, 0x4000, 0x3FFF_FFFF, 0x4000_0000, -1];
    let widths = [1, 1, 2, 2, 4, 4, 5, 5];

    for (&value, &width) in values.iter().zip(widths.iter()) {
        let bytes = encode_num(value);
        assert_eq!(bytes.len(), width, "width of {:#x}", value);
        assert_eq!(decode_num(&bytes).unwrap(), (value, width));
    }
}

#[test]
fn test_round_trip_extremes() {
    for value in [i32::MIN, i32::MAX, -0x40, 1, 0x7F, 0x100, 0x12_3456] {
        let bytes = encode_num(value);
        assert_eq!(decode_num(&bytes).unwrap().0, value);
    }
}

#[test]
fn test_round_trip_sampled_range() {
    // walk the positive range with a growing stride
    let mut value: i64 = 0;
    let mut stride: i64 = 1;
    while value <= i32::MAX as i64 {
        let v = value as i32;
        assert_eq!(decode_num(&encode_num(v)).unwrap(), (v, num_len(v)));
        value += stride;
        stride += stride / 8 + 1;
    }
}

// =============================================================================
// Format Details
// =============================================================================

#[test]
fn test_tags_in_first_byte() {
    assert_eq!(encode_num(5)[0] >> 6, 0b00);
    assert_eq!(encode_num(0x100)[0] >> 6, 0b01);
    assert_eq!(encode_num(0x10_0000)[0] >> 6, 0b10);
    assert_eq!(encode_num(-5)[0], NUM_MARKER);
}

#[test]
fn test_streaming_decode() {
    let values = [3, 0x3FFF, -7, 0x4000, 0];
    let mut buf = Vec::new();
    for &v in &values {
        put_num(&mut buf, v);
    }

    let mut pos = 0;
    let mut decoded = Vec::new();
    while pos < buf.len() {
        let width = num_width(buf[pos]);
        let (v, used) = decode_num(&buf[pos..]).unwrap();
        assert_eq!(width, used);
        decoded.push(v);
        pos += used;
    }
    assert_eq!(decoded, values);
}

#[test]
fn test_truncated_num_is_corrupt() {
    let bytes = encode_num(0x4000);
    let err = decode_num(&bytes[..2]).unwrap_err();
    assert!(matches!(err, StoreError::Corrupt(_)));
}

// =============================================================================
// Byte Strings
// =============================================================================

#[test]
fn test_token_round_trip() {
    for len in [0usize, 1, 0x3F, 0x40, 300, 0x4000] {
        let token: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let mut buf = Vec::new();
        put_token(&mut buf, &token).unwrap();
        assert_eq!(buf.len(), num_len(len as i32) + len);

        let (decoded, used) = decode_token(&buf).unwrap();
        assert_eq!(decoded, token.as_slice());
        assert_eq!(used, buf.len());
    }
}

#[test]
fn test_negative_token_length_is_corrupt() {
    let buf = encode_num(-1);
    assert!(matches!(decode_token(&buf), Err(StoreError::Corrupt(_))));
}
