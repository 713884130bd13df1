//! Fixed-width fields and byte strings
//!
//! Big-endian 1/2/4/5-byte integers at an offset inside a byte slice, and
//! byte strings prefixed with their compressed length.

use bytes::BufMut;

use crate::error::{Result, StoreError};

use super::num::{decode_num, num_len, put_num};

// =============================================================================
// Fixed-Width Integers
// =============================================================================

pub fn read1(buf: &[u8], off: usize) -> u8 {
    buf[off]
}

pub fn read2(buf: &[u8], off: usize) -> u16 {
    u16::from_be_bytes([buf[off], buf[off + 1]])
}

pub fn read4(buf: &[u8], off: usize) -> u32 {
    u32::from_be_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

/// Read a 40-bit big-endian integer
pub fn read5(buf: &[u8], off: usize) -> u64 {
    (buf[off] as u64) << 32 | read4(buf, off + 1) as u64
}

pub fn write1(buf: &mut [u8], off: usize, value: u8) {
    buf[off] = value;
}

pub fn write2(buf: &mut [u8], off: usize, value: u16) {
    buf[off..off + 2].copy_from_slice(&value.to_be_bytes());
}

pub fn write4(buf: &mut [u8], off: usize, value: u32) {
    buf[off..off + 4].copy_from_slice(&value.to_be_bytes());
}

/// Write the low 40 bits of `value`
pub fn write5(buf: &mut [u8], off: usize, value: u64) {
    buf[off] = (value >> 32) as u8;
    write4(buf, off + 1, value as u32);
}

// =============================================================================
// Byte Strings
// =============================================================================

/// Encoded size of a byte string of `len` bytes
pub fn token_len(len: usize) -> usize {
    num_len(len as i32) + len
}

/// Append a length-prefixed byte string to `buf`
pub fn put_token<B: BufMut>(buf: &mut B, token: &[u8]) -> Result<()> {
    let len = i32::try_from(token.len()).map_err(|_| {
        StoreError::InvalidInput(format!("byte string of {} bytes is too long", token.len()))
    })?;
    put_num(buf, len);
    buf.put_slice(token);
    Ok(())
}

/// Decode a length-prefixed byte string from the start of `buf`
///
/// Returns the string and the total number of bytes consumed.
pub fn decode_token(buf: &[u8]) -> Result<(&[u8], usize)> {
    let (len, width) = decode_num(buf)?;
    let len = usize::try_from(len)
        .map_err(|_| StoreError::Corrupt(format!("negative byte string length {}", len)))?;
    let end = width + len;
    if buf.len() < end {
        return Err(StoreError::Corrupt(format!(
            "truncated byte string: expected {} bytes, got {}",
            len,
            buf.len() - width
        )));
    }
    Ok((&buf[width..end], end))
}
