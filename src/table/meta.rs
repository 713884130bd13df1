//! Table metadata
//!
//! Block counts, the boundary index and the free-page bitmap, persisted in
//! the metadata file next to the data file.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::Path;

use bytes::BufMut;

use crate::codec::{decode_num, put_num};
use crate::error::{Result, StoreError};

use super::free::FreePages;

/// In-memory copy of the metadata file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableMeta {
    /// Number of physical blocks ever allocated in the data file
    pub blocks: usize,
    /// Number of blocks referenced by the index
    pub used: usize,
    /// First key of every used block, ascending
    pub fpres: Vec<usize>,
    /// Physical block number of every used block
    pub pages: Vec<usize>,
    /// Total number of records
    pub size: usize,
    /// Occupied physical blocks
    pub free: FreePages,
}

impl TableMeta {
    /// Read the metadata file; a missing file describes an empty table
    pub fn read(path: &Path) -> Result<Self> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };

        let mut input = MetaInput { buf: &data, pos: 0 };
        let blocks = input.count()?;
        let used = input.count()?;
        if used > blocks {
            return Err(StoreError::Corrupt(format!(
                "{} used blocks exceed {} allocated blocks",
                used, blocks
            )));
        }
        let fpres = (0..used).map(|_| input.count()).collect::<Result<Vec<_>>>()?;
        let pages = (0..used).map(|_| input.count()).collect::<Result<Vec<_>>>()?;
        let size = input.count()?;

        let words = input.count()?;
        let free = if words == 0 {
            FreePages::from_blocks(&pages)
        } else {
            FreePages::from_words((0..words).map(|_| input.long()).collect::<Result<Vec<_>>>()?)
        };

        let meta = Self { blocks, used, fpres, pages, size, free };
        meta.check()?;
        Ok(meta)
    }

    /// Rewrite the metadata file
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut out = Vec::with_capacity(16 + self.used * 8 + self.free.words().len() * 8);
        put_num(&mut out, to_num(self.blocks)?);
        put_num(&mut out, to_num(self.used)?);
        for &fpre in &self.fpres[..self.used] {
            put_num(&mut out, to_num(fpre)?);
        }
        for &page in &self.pages[..self.used] {
            put_num(&mut out, to_num(page)?);
        }
        put_num(&mut out, to_num(self.size)?);
        put_num(&mut out, to_num(self.free.words().len())?);
        for &word in self.free.words() {
            out.put_u64(word);
        }

        let mut file = File::create(path)?;
        file.write_all(&out)?;
        file.sync_all()?;
        Ok(())
    }

    /// Verify the boundary invariants
    fn check(&self) -> Result<()> {
        if self.used > 0 && self.fpres[0] != 0 {
            return Err(StoreError::Corrupt(format!(
                "first block starts at key {}",
                self.fpres[0]
            )));
        }
        if self.used == 0 && self.size != 0 {
            return Err(StoreError::Corrupt(format!(
                "{} records but no used blocks",
                self.size
            )));
        }
        for i in 0..self.used {
            let next = if i + 1 < self.used { self.fpres[i + 1] } else { self.size };
            if next <= self.fpres[i] {
                return Err(StoreError::Corrupt(format!(
                    "block {} is empty or out of order ({} .. {})",
                    i, self.fpres[i], next
                )));
            }
            if self.pages[i] >= self.blocks {
                return Err(StoreError::Corrupt(format!(
                    "block number {} exceeds allocation count {}",
                    self.pages[i], self.blocks
                )));
            }
        }
        Ok(())
    }
}

fn to_num(value: usize) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| StoreError::Corrupt(format!("metadata value {} is out of range", value)))
}

/// Sequential reader over the metadata bytes
struct MetaInput<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl MetaInput<'_> {
    /// Read a non-negative compressed integer
    fn count(&mut self) -> Result<usize> {
        let (value, width) = decode_num(&self.buf[self.pos..])?;
        self.pos += width;
        usize::try_from(value)
            .map_err(|_| StoreError::Corrupt(format!("negative metadata value {}", value)))
    }

    fn long(&mut self) -> Result<u64> {
        let end = self.pos + 8;
        let bytes = self.buf.get(self.pos..end).ok_or_else(|| {
            StoreError::Corrupt("truncated free-page bitmap".to_string())
        })?;
        self.pos = end;
        let mut word = [0u8; 8];
        word.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(word))
    }
}
