//! Table Module
//!
//! Fixed-size node records addressed by dense keys `[0, size)` and stored in
//! fixed-size blocks of a data file.
//!
//! ## Responsibilities
//! - Resolve a key to its block through a sparse boundary index
//! - Cache a few blocks in memory and write dirty ones back
//! - Read and write big-endian fields inside a record
//! - Insert and delete runs of records, splitting and dropping blocks
//!
//! ## Data File
//! ```text
//! ┌──────────────────────┬──────────────────────┬─────
//! │ Block 0 (blockSize)  │ Block 1 (blockSize)  │ ...
//! │ [rec][rec]...[free]  │ [rec][rec]...[free]  │
//! └──────────────────────┴──────────────────────┴─────
//! ```
//! Record `i` of a block lives at byte `i * recordSize`. Blocks appear in
//! the file in allocation order; the index gives their logical order.
//!
//! ## Metadata File
//! ```text
//! ┌────────────┬──────────┬──────────────────┬──────────────────┬──────┬────────────────────┐
//! │ Blocks (n) │ Used (n) │ FirstKey[used]   │ BlockNo[used]    │ Size │ Words (n) + u64 BE │
//! └────────────┴──────────┴──────────────────┴──────────────────┴──────┴────────────────────┘
//! ```
//! `(n)` marks compressed integers. The trailing words hold the free-page
//! bitmap; a word count of zero makes `open` rebuild it from the index.

mod buffers;
mod free;
mod meta;
mod store;

use std::path::{Path, PathBuf};

pub use buffers::{Buffer, Buffers, Locate};
pub use free::FreePages;
pub use meta::TableMeta;
pub use store::{SharedTable, TableStore};

/// Extension of the table data file
pub const DATA_EXTENSION: &str = "tbl";

/// Extension of the table metadata file
pub const META_EXTENSION: &str = "tbli";

/// The pair of files backing one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFiles {
    /// Block data
    pub data: PathBuf,
    /// Counts, boundary index and free-page bitmap
    pub meta: PathBuf,
}

impl TableFiles {
    pub fn new(data: impl Into<PathBuf>, meta: impl Into<PathBuf>) -> Self {
        Self {
            data: data.into(),
            meta: meta.into(),
        }
    }

    /// `{dir}/{name}.tbl` and `{dir}/{name}.tbli`
    pub fn in_dir(dir: &Path, name: &str) -> Self {
        Self::new(
            dir.join(format!("{}.{}", name, DATA_EXTENSION)),
            dir.join(format!("{}.{}", name, META_EXTENSION)),
        )
    }
}
