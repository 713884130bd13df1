//! Codec Module
//!
//! Compressed integers, fixed-width big-endian fields and length-prefixed
//! byte strings. Every other component persists its data through these
//! functions, and the table metadata file is written with them.
//!
//! ## Compressed Integer Format
//!
//! The top two bits of the first byte select the width, so a decoder never
//! needs an external length field:
//!
//! | First byte   | Bytes | Value                                       |
//! |--------------|-------|---------------------------------------------|
//! | `00xxxxxx`   | 1     | low 6 bits (0 - 0x3F)                       |
//! | `01xxxxxx`   | 2     | `(low 6 bits << 8) \| b1` (up to 0x3FFF)     |
//! | `10xxxxxx`   | 4     | `(low 6 bits << 24) \| b1..b3` (up to 0x3FFFFFFF) |
//! | `11000000`   | 5     | next 4 bytes as big-endian 32-bit integer   |
//!
//! The 5-byte form carries negative numbers and magnitudes above 0x3FFFFFFF.
//!
//! ## Byte-String Format
//! ```text
//! ┌──────────────────────┬──────────────────────┐
//! │ Length (compressed)  │ Bytes (Length)       │
//! └──────────────────────┴──────────────────────┘
//! ```
//!
//! All functions are pure and allocation-free apart from the `Vec`
//! convenience wrappers.

mod fixed;
mod num;

pub use fixed::{
    decode_token, put_token, read1, read2, read4, read5, token_len, write1, write2, write4,
    write5,
};
pub use num::{decode_num, encode_num, num_len, num_width, put_num, NUM_MARKER};
