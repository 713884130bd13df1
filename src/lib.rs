//! # nodestore
//!
//! Persistent storage core of a tree-structured database:
//! - A block-based table of fixed-size node records addressed by dense keys
//! - A variable-length value store for text and attribute contents
//! - A compact, self-describing integer codec shared by both
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Query / Update Layer (caller)                │
//! └──────────────┬──────────────────────────────┬───────────────┘
//!                │ key, field offset             │ byte position
//!                ▼                               ▼
//!   ┌────────────────────────┐        ┌────────────────────────┐
//!   │      TableStore        │        │      ValueStore        │
//!   │  boundary index +      │        │  sliding window over   │
//!   │  block buffers         │        │  length-prefixed bytes │
//!   └───────────┬────────────┘        └───────────┬────────────┘
//!               │                                 │
//!               ▼                                 ▼
//!   ┌────────────────────────┐        ┌────────────────────────┐
//!   │ name.tbl / name.tbli   │        │      value file        │
//!   └────────────────────────┘        └────────────────────────┘
//!               └──────────── codec (compressed ints) ─┘
//! ```
//!
//! Keys are positions, not identifiers: inserting or deleting records
//! renumbers every later record.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod table;
pub mod values;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{StoreError, Result};
pub use config::Config;
pub use table::{TableFiles, TableStore};
pub use values::{ValueAccess, ValueStore};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of nodestore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
