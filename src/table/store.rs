//! Table Store
//!
//! Block-wise access to the node table with a sparse boundary index.

use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::codec;
use crate::config::Config;
use crate::error::{Result, StoreError};

use super::buffers::{Buffer, Buffers, Locate};
use super::meta::TableMeta;
use super::TableFiles;

/// A table store behind the coarse per-instance lock
pub type SharedTable = Arc<Mutex<TableStore>>;

/// Fixed-size records stored block-wise on disk
///
/// ## Concurrency:
/// - Every operation takes `&mut self`: one writer, no internal locking
/// - Wrap the store with `into_shared()` when several threads need it
///
/// ## Lifecycle:
/// - `open` reads the metadata file and loads the first block
/// - Blocks are loaded on first access and written back on eviction
/// - `close` (or `flush`) writes dirty blocks and rewrites the metadata
pub struct TableStore {
    /// Layout and access settings
    config: Config,
    /// Data and metadata paths
    files: TableFiles,
    /// Data file handle
    file: File,
    /// Cached blocks
    buffers: Buffers,
    /// Block counts and boundary index
    meta: TableMeta,
    /// Index of the current block in the boundary arrays
    page: usize,
    /// Metadata changed since the last flush
    dirty: bool,
    /// Set once `close` has run
    closed: bool,
}

impl TableStore {
    /// Open a table, creating empty files if none exist
    pub fn open(files: TableFiles, config: Config) -> Result<Self> {
        config.validate()?;

        let meta = TableMeta::read(&files.meta)?;
        let per_block = config.records_per_block();
        for i in 0..meta.used {
            let next = if i + 1 < meta.used { meta.fpres[i + 1] } else { meta.size };
            if next - meta.fpres[i] > per_block {
                return Err(StoreError::Corrupt(format!(
                    "block {} holds {} records, capacity is {}",
                    i,
                    next - meta.fpres[i],
                    per_block
                )));
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(!config.read_only)
            .create(!config.read_only)
            .open(&files.data)?;

        debug!(
            data = %files.data.display(),
            blocks = meta.blocks,
            used = meta.used,
            size = meta.size,
            "opened table"
        );

        let mut table = Self {
            buffers: Buffers::new(config.buffers, config.block_size),
            config,
            files,
            file,
            meta,
            page: 0,
            dirty: false,
            closed: false,
        };
        if table.meta.used > 0 {
            table.load_block(table.meta.pages[0])?;
        }
        Ok(table)
    }

    /// Wrap the store in a mutex for shared use
    pub fn into_shared(self) -> SharedTable {
        Arc::new(Mutex::new(self))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Number of records
    pub fn size(&self) -> usize {
        self.meta.size
    }

    pub fn is_empty(&self) -> bool {
        self.meta.size == 0
    }

    /// Number of physical blocks allocated in the data file
    pub fn blocks(&self) -> usize {
        self.meta.blocks
    }

    /// Number of blocks referenced by the index
    pub fn used_blocks(&self) -> usize {
        self.meta.used
    }

    /// `(first key, physical block)` for every used block, in key order
    pub fn boundaries(&self) -> Vec<(usize, usize)> {
        self.meta
            .fpres
            .iter()
            .copied()
            .zip(self.meta.pages.iter().copied())
            .collect()
    }

    pub fn record_size(&self) -> usize {
        self.config.record_size()
    }

    pub fn files(&self) -> &TableFiles {
        &self.files
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Field Access
    // =========================================================================

    pub fn read1(&mut self, key: usize, off: usize) -> Result<u8> {
        let o = self.field(key, off, 1)?;
        Ok(codec::read1(&self.buffers.current().data, o))
    }

    pub fn read2(&mut self, key: usize, off: usize) -> Result<u16> {
        let o = self.field(key, off, 2)?;
        Ok(codec::read2(&self.buffers.current().data, o))
    }

    pub fn read4(&mut self, key: usize, off: usize) -> Result<u32> {
        let o = self.field(key, off, 4)?;
        Ok(codec::read4(&self.buffers.current().data, o))
    }

    pub fn read5(&mut self, key: usize, off: usize) -> Result<u64> {
        let o = self.field(key, off, 5)?;
        Ok(codec::read5(&self.buffers.current().data, o))
    }

    pub fn write1(&mut self, key: usize, off: usize, value: u8) -> Result<()> {
        let o = self.writable_field(key, off, 1)?;
        codec::write1(&mut self.touch().data, o, value);
        Ok(())
    }

    pub fn write2(&mut self, key: usize, off: usize, value: u16) -> Result<()> {
        let o = self.writable_field(key, off, 2)?;
        codec::write2(&mut self.touch().data, o, value);
        Ok(())
    }

    pub fn write4(&mut self, key: usize, off: usize, value: u32) -> Result<()> {
        let o = self.writable_field(key, off, 4)?;
        codec::write4(&mut self.touch().data, o, value);
        Ok(())
    }

    /// Write the low 40 bits of `value`
    pub fn write5(&mut self, key: usize, off: usize, value: u64) -> Result<()> {
        let o = self.writable_field(key, off, 5)?;
        codec::write5(&mut self.touch().data, o, value);
        Ok(())
    }

    /// Copy of the record at `key`
    pub fn read_record(&mut self, key: usize) -> Result<Vec<u8>> {
        let o = self.cursor(key)?;
        let rs = self.record_size();
        Ok(self.buffers.current().data[o..o + rs].to_vec())
    }

    /// Overwrite existing records starting at `key`
    pub fn write_records(&mut self, key: usize, records: &[u8]) -> Result<()> {
        self.check_writable("write_records")?;
        let n = self.record_count(records)?;
        if key + n > self.meta.size {
            return Err(StoreError::OutOfBounds {
                key: key + n - 1,
                size: self.meta.size,
            });
        }
        let rs = self.record_size();
        for (i, record) in records.chunks_exact(rs).enumerate() {
            let o = self.cursor(key + i)?;
            self.touch().data[o..o + rs].copy_from_slice(record);
        }
        Ok(())
    }

    // =========================================================================
    // Structural Changes
    // =========================================================================

    /// Insert whole records so that the first one gets key `pre`
    ///
    /// All records at `pre` and later move up by the number of inserted
    /// records. `pre == size()` appends.
    pub fn insert(&mut self, pre: usize, records: &[u8]) -> Result<()> {
        self.check_writable("insert")?;
        let n = self.record_count(records)?;
        if n == 0 {
            return Ok(());
        }
        if pre > self.meta.size {
            return Err(StoreError::OutOfBounds {
                key: pre,
                size: self.meta.size,
            });
        }
        self.dirty = true;

        let rs = self.record_size();
        let bs = self.config.block_size;

        // position the cursor on the block that receives the first new record
        let split = if self.meta.used == 0 {
            let block = self.allocate();
            self.meta.fpres.push(0);
            self.meta.pages.push(block);
            self.meta.used = 1;
            self.page = 0;
            self.fresh_block(block, &[])?;
            0
        } else if pre > 0 {
            self.cursor(pre - 1)? + rs
        } else {
            self.cursor(0)?
        };

        let page = self.page;
        let fpre = self.first(page);
        let nold = self.count(page) * rs;
        let len = records.len();

        // everything fits into the current block
        if nold + len <= bs {
            let buf = self.touch();
            buf.data.copy_within(split..nold, split + len);
            buf.data[split..split + len].copy_from_slice(records);
            for f in &mut self.meta.fpres[page + 1..] {
                *f += n;
            }
            self.meta.size += n;
            return Ok(());
        }

        // new records followed by the tail that has to leave the current block
        let mut all = Vec::with_capacity(len + nold - split);
        all.extend_from_slice(records);
        all.extend_from_slice(&self.buffers.current().data[split..nold]);

        let head = bs - split;
        if head > 0 {
            self.touch().data[split..].copy_from_slice(&all[..head]);
        }
        let mut next_first = fpre + self.config.records_per_block();
        let rest = &all[head..];

        // chunks for new blocks; a short last chunk may join the next block instead
        let fill = self.config.fill_records() * rs;
        let mut chunks: Vec<&[u8]> = rest.chunks(fill).collect();
        let mut prepend: Option<(usize, &[u8])> = None;
        if let Some(last) = chunks.last().copied() {
            if last.len() < fill && page + 1 < self.meta.used {
                let free = bs - self.count(page + 1) * rs;
                if last.len() <= free {
                    prepend = Some((self.meta.pages[page + 1], last));
                    chunks.pop();
                }
            }
        }

        let mut new_firsts = Vec::with_capacity(chunks.len());
        let mut new_pages = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let block = self.allocate();
            self.fresh_block(block, chunk)?;
            new_firsts.push(next_first);
            new_pages.push(block);
            next_first += chunk.len() / rs;
        }

        if let Some((block, tail)) = prepend {
            let occupied = self.count(page + 1) * rs;
            self.load_block(block)?;
            let buf = self.touch();
            buf.data.copy_within(..occupied, tail.len());
            buf.data[..tail.len()].copy_from_slice(tail);
        }

        let needed = new_pages.len();
        let at = page + 1;
        self.meta.fpres.splice(at..at, new_firsts);
        self.meta.pages.splice(at..at, new_pages);
        self.meta.used += needed;

        let mut after = at + needed;
        if prepend.is_some() {
            self.meta.fpres[after] = next_first;
            after += 1;
        }
        for f in &mut self.meta.fpres[after..] {
            *f += n;
        }
        self.meta.size += n;
        self.page = page;

        debug!(
            pre,
            records = n,
            new_blocks = needed,
            joined_next = prepend.is_some(),
            "split block on insert"
        );
        Ok(())
    }

    /// Delete `count` records starting at key `pre`
    ///
    /// All later records move down by `count`.
    pub fn delete(&mut self, pre: usize, count: usize) -> Result<()> {
        self.check_writable("delete")?;
        if count == 0 {
            return Ok(());
        }
        let last = pre + count;
        if last > self.meta.size {
            return Err(StoreError::OutOfBounds {
                key: last - 1,
                size: self.meta.size,
            });
        }
        self.dirty = true;

        let rs = self.record_size();
        let from = self.cursor(pre)?;
        let p = self.page;
        let fpre = self.first(p);
        let npre = self.next_first(p);

        // all records lie in the current block
        if last <= npre {
            let end = (npre - fpre) * rs;
            self.touch().data.copy_within(from + count * rs..end, from);
            for f in &mut self.meta.fpres[p + 1..] {
                *f -= count;
            }
            self.meta.size -= count;

            if npre - fpre == count {
                self.release(p..p + 1);
            }
            self.reset_page(p);
            return Ok(());
        }

        // the range ends in a later block q
        let q = self.meta.fpres.partition_point(|&f| f < last) - 1;
        let q_first = self.first(q);
        let q_next = self.next_first(q);
        if last < q_next {
            self.load_block(self.meta.pages[q])?;
            let start = (last - q_first) * rs;
            let end = (q_next - q_first) * rs;
            self.touch().data.copy_within(start..end, 0);
        }

        let drop_from = if pre == fpre { p } else { p + 1 };
        let drop_to = if last == q_next { q + 1 } else { q };
        self.release(drop_from..drop_to);

        let mut shift_from = drop_from;
        if last < q_next {
            // the partial last block now starts where the deleted range did
            self.meta.fpres[drop_from] = pre;
            shift_from += 1;
        }
        for f in &mut self.meta.fpres[shift_from..] {
            *f -= count;
        }
        self.meta.size -= count;
        self.reset_page(drop_from);
        Ok(())
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Write dirty blocks and, if the index changed, the metadata file
    pub fn flush(&mut self) -> Result<()> {
        if self.config.read_only {
            return Ok(());
        }
        let bs = self.config.block_size;
        let mut written = 0;
        for buf in self.buffers.dirty_mut() {
            write_back(&mut self.file, bs, buf)?;
            written += 1;
        }
        if written > 0 {
            self.file.sync_all()?;
        }
        if self.dirty {
            self.meta.write(&self.files.meta)?;
            self.dirty = false;
        }
        debug!(
            blocks_written = written,
            used = self.meta.used,
            size = self.meta.size,
            "flushed table"
        );
        Ok(())
    }

    /// Flush and release the file handle
    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        self.closed = true;
        debug!(data = %self.files.data.display(), "closed table");
        Ok(())
    }

    // =========================================================================
    // Cursor
    // =========================================================================

    /// Load the block holding `key` and return the record's offset inside it
    pub fn cursor(&mut self, key: usize) -> Result<usize> {
        if key >= self.meta.size {
            return Err(StoreError::OutOfBounds {
                key,
                size: self.meta.size,
            });
        }
        let cached = self.page < self.meta.used
            && self.first(self.page) <= key
            && key < self.next_first(self.page);
        if !cached {
            self.page = self.meta.fpres.partition_point(|&f| f <= key) - 1;
        }
        self.load_block(self.meta.pages[self.page])?;
        Ok((key - self.first(self.page)) << self.config.record_power)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn first(&self, page: usize) -> usize {
        self.meta.fpres[page]
    }

    /// First key of the block after `page`, or the table size
    fn next_first(&self, page: usize) -> usize {
        if page + 1 < self.meta.used {
            self.meta.fpres[page + 1]
        } else {
            self.meta.size
        }
    }

    /// Records held by the block at index `page`
    fn count(&self, page: usize) -> usize {
        self.next_first(page) - self.first(page)
    }

    fn record_count(&self, records: &[u8]) -> Result<usize> {
        let rs = self.record_size();
        if records.len() % rs != 0 {
            return Err(StoreError::InvalidInput(format!(
                "{} bytes are not a whole number of {}-byte records",
                records.len(),
                rs
            )));
        }
        Ok(records.len() / rs)
    }

    fn check_writable(&self, op: &str) -> Result<()> {
        if self.config.read_only {
            return Err(StoreError::Unsupported(format!("{} on a read-only table", op)));
        }
        Ok(())
    }

    /// Buffer offset of a field of `width` bytes at `off` inside record `key`
    fn field(&mut self, key: usize, off: usize, width: usize) -> Result<usize> {
        if off + width > self.record_size() {
            return Err(StoreError::InvalidInput(format!(
                "{}-byte field at offset {} exceeds the {}-byte record",
                width,
                off,
                self.record_size()
            )));
        }
        Ok(self.cursor(key)? + off)
    }

    fn writable_field(&mut self, key: usize, off: usize, width: usize) -> Result<usize> {
        self.check_writable("write")?;
        self.field(key, off, width)
    }

    /// The current buffer, marked dirty
    fn touch(&mut self) -> &mut Buffer {
        let buf = self.buffers.current_mut();
        buf.dirty = true;
        buf
    }

    /// Make `block` the current buffer, reading it from disk on a miss
    fn load_block(&mut self, block: usize) -> Result<()> {
        if let Locate::Miss(slot) = self.buffers.locate(block) {
            let bs = self.config.block_size;
            let buf = self.buffers.get_mut(slot);
            if buf.dirty {
                write_back(&mut self.file, bs, buf)?;
            }
            // the slot holds no block until the read has succeeded
            buf.block = None;
            read_block(&mut self.file, block, &mut buf.data)?;
            buf.block = Some(block);
            trace!(block, slot, "loaded block");
        }
        Ok(())
    }

    /// Make `block` the current buffer and fill it with `data`, zeroing the rest
    fn fresh_block(&mut self, block: usize, data: &[u8]) -> Result<()> {
        if let Locate::Miss(slot) = self.buffers.locate(block) {
            let bs = self.config.block_size;
            let buf = self.buffers.get_mut(slot);
            if buf.dirty {
                write_back(&mut self.file, bs, buf)?;
            }
            buf.block = Some(block);
        }
        let buf = self.touch();
        buf.data[..data.len()].copy_from_slice(data);
        buf.data[data.len()..].fill(0);
        Ok(())
    }

    /// Claim the lowest free physical block
    fn allocate(&mut self) -> usize {
        let block = self.meta.free.next_free();
        self.meta.free.set(block);
        if block >= self.meta.blocks {
            self.meta.blocks = block + 1;
        }
        block
    }

    /// Drop index entries in `range` and mark their blocks free
    fn release(&mut self, range: std::ops::Range<usize>) {
        if range.is_empty() {
            return;
        }
        for &block in &self.meta.pages[range.clone()] {
            self.meta.free.clear(block);
        }
        let released = range.len();
        self.meta.fpres.drain(range.clone());
        self.meta.pages.drain(range);
        self.meta.used -= released;
        debug!(released, used = self.meta.used, "released blocks on delete");
    }

    /// Point the cursor at a valid index entry near `page`
    fn reset_page(&mut self, page: usize) {
        self.page = page.min(self.meta.used.saturating_sub(1));
    }
}

impl Drop for TableStore {
    fn drop(&mut self) {
        if self.closed || self.config.read_only {
            return;
        }
        if self.dirty || self.buffers.has_dirty() {
            warn!(data = %self.files.data.display(), "table dropped without close, flushing");
            if let Err(e) = self.flush() {
                warn!(error = %e, "flush on drop failed");
            }
        }
    }
}

/// Write a dirty buffer to its block
fn write_back(file: &mut File, block_size: usize, buf: &mut Buffer) -> io::Result<()> {
    if let Some(block) = buf.block {
        file.seek(SeekFrom::Start((block * block_size) as u64))?;
        file.write_all(&buf.data)?;
        trace!(block, "wrote block");
    }
    buf.dirty = false;
    Ok(())
}

/// Read a block; bytes past the end of the file read as zero
fn read_block(file: &mut File, block: usize, data: &mut [u8]) -> io::Result<()> {
    file.seek(SeekFrom::Start((block * data.len()) as u64))?;
    let mut filled = 0;
    while filled < data.len() {
        match file.read(&mut data[filled..]) {
            Ok(0) => break,
            Ok(k) => filled += k,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    data[filled..].fill(0);
    Ok(())
}
