//! Compressed integers
//!
//! Width selection and decoding of the self-describing integer format.

use bytes::BufMut;

use crate::error::{Result, StoreError};

/// First byte of the 5-byte form
pub const NUM_MARKER: u8 = 0xC0;

/// Upper bounds (inclusive) of the 1-, 2- and 4-byte forms
const MAX_1: i32 = 0x3F;
const MAX_2: i32 = 0x3FFF;
const MAX_4: i32 = 0x3FFF_FFFF;

/// Number of bytes `value` occupies once encoded
pub fn num_len(value: i32) -> usize {
    match value {
        0..=MAX_1 => 1,
        0..=MAX_2 => 2,
        0..=MAX_4 => 4,
        _ => 5,
    }
}

/// Encoded width announced by the first byte of a compressed integer
pub fn num_width(first: u8) -> usize {
    match first >> 6 {
        0 => 1,
        1 => 2,
        2 => 4,
        _ => 5,
    }
}

/// Append the compressed form of `value` to `buf`
pub fn put_num<B: BufMut>(buf: &mut B, value: i32) {
    match num_len(value) {
        1 => buf.put_u8(value as u8),
        2 => buf.put_u16(value as u16 | 0x4000),
        4 => buf.put_u32(value as u32 | 0x8000_0000),
        _ => {
            buf.put_u8(NUM_MARKER);
            buf.put_u32(value as u32);
        }
    }
}

/// Encode `value` into a fresh vector
pub fn encode_num(value: i32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(num_len(value));
    put_num(&mut buf, value);
    buf
}

/// Decode a compressed integer from the start of `buf`
///
/// Returns the value and the number of bytes consumed.
pub fn decode_num(buf: &[u8]) -> Result<(i32, usize)> {
    let first = *buf
        .first()
        .ok_or_else(|| StoreError::Corrupt("empty buffer for compressed integer".to_string()))?;
    let width = num_width(first);
    if buf.len() < width {
        return Err(StoreError::Corrupt(format!(
            "truncated {}-byte compressed integer ({} bytes available)",
            width,
            buf.len()
        )));
    }

    let value = match width {
        1 => first as i32,
        2 => ((first as i32 & 0x3F) << 8) | buf[1] as i32,
        4 => {
            ((first as i32 & 0x3F) << 24)
                | (buf[1] as i32) << 16
                | (buf[2] as i32) << 8
                | buf[3] as i32
        }
        _ => {
            if first != NUM_MARKER {
                return Err(StoreError::Corrupt(format!(
                    "invalid compressed integer marker: 0x{:02x}",
                    first
                )));
            }
            u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]) as i32
        }
    };
    Ok((value, width))
}
