//! Value Store
//!
//! Buffered, single-window implementation of [`ValueAccess`].

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::codec::{decode_num, num_width, put_token, token_len};
use crate::config::Config;
use crate::error::{Result, StoreError};

use super::{ValueAccess, Window};

/// A value store behind the coarse per-instance lock
pub type SharedValues = Arc<Mutex<ValueStore>>;

/// Length-prefixed values in a single file, cached through one window
pub struct ValueStore {
    /// Access settings
    config: Config,
    /// File path
    path: PathBuf,
    /// File handle
    file: File,
    /// Currently loaded range
    window: Window,
    /// Logical file length, including unflushed writes
    len: u64,
    /// Set once `close` has run
    closed: bool,
}

impl ValueStore {
    /// Open a value file, creating it if it does not exist
    pub fn open(path: &Path, config: Config) -> Result<Self> {
        config.validate()?;

        let file = OpenOptions::new()
            .read(true)
            .write(!config.read_only)
            .create(!config.read_only)
            .open(path)?;
        let len = file.metadata()?.len();

        debug!(path = %path.display(), len, "opened value store");

        Ok(Self {
            window: Window::new(config.window_size),
            config,
            path: path.to_path_buf(),
            file,
            len,
            closed: false,
        })
    }

    /// Wrap the store in a mutex for shared use
    pub fn into_shared(self) -> SharedValues {
        Arc::new(Mutex::new(self))
    }

    /// Logical length in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `value` at the end and return its position
    pub fn append(&mut self, value: &[u8]) -> Result<u64> {
        let pos = self.len;
        self.write(pos, value)?;
        Ok(pos)
    }

    /// Decode the compressed integer at `pos`
    ///
    /// Returns the value and its encoded width.
    pub fn read_num(&mut self, pos: u64) -> Result<(i32, usize)> {
        let first = self.read_bytes(pos, 1)?[0];
        let width = num_width(first);
        let bytes = self.read_bytes(pos, width)?;
        decode_num(&bytes)
    }

    /// Read `len` raw bytes starting at `pos`
    pub fn read_bytes(&mut self, pos: u64, len: usize) -> Result<Bytes> {
        let end = pos + len as u64;
        if end > self.len {
            return Err(StoreError::OutOfBounds {
                key: end as usize - 1,
                size: self.len as usize,
            });
        }

        let mut out = BytesMut::with_capacity(len);
        let mut p = pos;
        while p < end {
            let off = self.cursor(p)?;
            let n = ((end - p) as usize).min(self.window.size() - off);
            out.put_slice(&self.window.data[off..off + n]);
            p += n as u64;
        }
        Ok(out.freeze())
    }

    /// Write raw bytes at `pos`, extending the file if needed
    fn write_bytes(&mut self, pos: u64, bytes: &[u8]) -> Result<()> {
        // windows filled by this write are flushed up to the new length
        self.len = self.len.max(pos + bytes.len() as u64);
        let mut done = 0;
        while done < bytes.len() {
            let off = self.cursor(pos + done as u64)?;
            let n = (bytes.len() - done).min(self.window.size() - off);
            self.window.data[off..off + n].copy_from_slice(&bytes[done..done + n]);
            self.window.dirty = true;
            done += n;
        }
        Ok(())
    }

    fn check_writable(&self) -> Result<()> {
        if self.config.read_only {
            return Err(StoreError::Unsupported(
                "write on a read-only value store".to_string(),
            ));
        }
        Ok(())
    }

    /// Write the window back, covering only bytes below the logical length
    fn write_window(&mut self) -> Result<()> {
        if let Some(offset) = self.window.offset {
            if self.window.dirty && self.len > offset {
                let n = ((self.len - offset) as usize).min(self.window.size());
                self.file.seek(SeekFrom::Start(offset))?;
                self.file.write_all(&self.window.data[..n])?;
                trace!(offset, bytes = n, "wrote window");
            }
        }
        self.window.dirty = false;
        Ok(())
    }

    /// Load the window starting at `offset`; bytes past the file end read as zero
    fn load_window(&mut self, offset: u64) -> Result<()> {
        // no range is cached while `data` is being replaced
        self.window.offset = None;
        self.file.seek(SeekFrom::Start(offset))?;
        let data = &mut self.window.data;
        let mut filled = 0;
        while filled < data.len() {
            match self.file.read(&mut data[filled..]) {
                Ok(0) => break,
                Ok(k) => filled += k,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        data[filled..].fill(0);
        self.window.offset = Some(offset);
        trace!(offset, bytes = filled, "loaded window");
        Ok(())
    }
}

impl ValueAccess for ValueStore {
    fn read(&mut self, pos: u64) -> Result<Bytes> {
        let (len, width) = self.read_num(pos)?;
        let len = usize::try_from(len).map_err(|_| {
            StoreError::Corrupt(format!("negative value length {} at position {}", len, pos))
        })?;
        self.read_bytes(pos + width as u64, len)
    }

    fn write(&mut self, pos: u64, value: &[u8]) -> Result<u64> {
        self.check_writable()?;
        let mut encoded = BytesMut::with_capacity(token_len(value.len()));
        put_token(&mut encoded, value)?;

        // an overwrite must keep the encoded size of the entry it replaces
        if pos < self.len {
            let (old_len, width) = self.read_num(pos)?;
            let old_size = width as i64 + old_len as i64;
            if old_len < 0 || old_size != encoded.len() as i64 {
                return Err(StoreError::InvalidInput(format!(
                    "overwrite at {} changes entry size from {} to {} bytes",
                    pos,
                    old_size,
                    encoded.len()
                )));
            }
        }
        self.write_bytes(pos, &encoded)?;
        Ok(pos + encoded.len() as u64)
    }

    fn cursor(&mut self, pos: u64) -> Result<usize> {
        if !self.window.covers(pos) {
            self.write_window()?;
            let start = self.window.start_of(pos);
            self.load_window(start)?;
        }
        Ok((pos % self.window.size() as u64) as usize)
    }

    fn flush(&mut self) -> Result<()> {
        if self.config.read_only {
            return Ok(());
        }
        let dirty = self.window.dirty;
        self.write_window()?;
        if dirty {
            self.file.sync_all()?;
        }
        debug!(len = self.len, "flushed value store");
        Ok(())
    }

    fn close(mut self) -> Result<()> {
        self.flush()?;
        self.closed = true;
        debug!(path = %self.path.display(), "closed value store");
        Ok(())
    }
}

impl Drop for ValueStore {
    fn drop(&mut self) {
        if self.closed || self.config.read_only || !self.window.dirty {
            return;
        }
        warn!(path = %self.path.display(), "value store dropped without close, flushing");
        if let Err(e) = self.flush() {
            warn!(error = %e, "flush on drop failed");
        }
    }
}
