//! Value Store Module
//!
//! Variable-length text and attribute values addressed by byte offset.
//!
//! ## Responsibilities
//! - Store values as length-prefixed byte strings
//! - Serve reads through a sliding window over the file
//! - Append during construction, overwrite in place afterwards
//!
//! ## File Format
//! ```text
//! ┌───────────────┬────────────┬───────────────┬────────────┬─────
//! │ Len (n)       │ Bytes      │ Len (n)       │ Bytes      │ ...
//! └───────────────┴────────────┴───────────────┴────────────┴─────
//! ```
//! `(n)` is the compressed integer format of [`crate::codec`]. Entries carry
//! no alignment; a value may straddle any number of windows.

mod store;
mod window;

use bytes::Bytes;

use crate::error::Result;

pub use store::{SharedValues, ValueStore};
pub use window::Window;

/// Positional access to length-prefixed values
///
/// Reading at a position returned by a write reproduces the bytes written,
/// whatever windows the value crosses.
pub trait ValueAccess {
    /// Read the value starting at `pos`
    fn read(&mut self, pos: u64) -> Result<Bytes>;

    /// Write `value` at `pos` and return the position after it
    fn write(&mut self, pos: u64, value: &[u8]) -> Result<u64>;

    /// Bring `pos` into the window and return its offset there
    fn cursor(&mut self, pos: u64) -> Result<usize>;

    /// Write back buffered changes
    fn flush(&mut self) -> Result<()>;

    /// Flush and release the file
    fn close(self) -> Result<()>
    where
        Self: Sized;
}
