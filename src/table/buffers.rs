//! Block Buffers
//!
//! A small, fixed number of in-memory block images with dirty tracking.
//!
//! Slots are searched starting at the most recently used one and wrapping
//! around. On a miss the slot after the current one becomes the victim;
//! there is no recency ordering. The pool never touches the disk itself: the
//! table store writes a dirty victim back before it loads a new block into
//! the slot.

/// In-memory copy of one block
#[derive(Debug)]
pub struct Buffer {
    /// Block contents
    pub data: Box<[u8]>,
    /// Physical block number held by this buffer, `None` while unused
    pub block: Option<usize>,
    /// Contents differ from the block on disk
    pub dirty: bool,
}

impl Buffer {
    fn new(block_size: usize) -> Self {
        Self {
            data: vec![0u8; block_size].into_boxed_slice(),
            block: None,
            dirty: false,
        }
    }
}

/// Outcome of a buffer lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locate {
    /// The block is already cached in this slot
    Hit(usize),
    /// The block must be loaded into this slot (write it back first if dirty)
    Miss(usize),
}

/// Fixed pool of block buffers
#[derive(Debug)]
pub struct Buffers {
    buffers: Vec<Buffer>,
    /// Index of the current slot
    current: usize,
}

impl Buffers {
    /// Create `count` empty buffers of `block_size` bytes
    pub fn new(count: usize, block_size: usize) -> Self {
        Self {
            buffers: (0..count).map(|_| Buffer::new(block_size)).collect(),
            current: 0,
        }
    }

    /// Find the slot for `block` and make it the current one
    pub fn locate(&mut self, block: usize) -> Locate {
        let count = self.buffers.len();
        for step in 0..count {
            let slot = (self.current + step) % count;
            if self.buffers[slot].block == Some(block) {
                self.current = slot;
                return Locate::Hit(slot);
            }
        }
        self.current = (self.current + 1) % count;
        Locate::Miss(self.current)
    }

    /// The current buffer
    pub fn current(&self) -> &Buffer {
        &self.buffers[self.current]
    }

    /// The current buffer, mutably
    pub fn current_mut(&mut self) -> &mut Buffer {
        &mut self.buffers[self.current]
    }

    pub fn get_mut(&mut self, slot: usize) -> &mut Buffer {
        &mut self.buffers[slot]
    }

    /// All buffers holding unsaved changes
    pub fn dirty_mut(&mut self) -> impl Iterator<Item = &mut Buffer> {
        self.buffers.iter_mut().filter(|b| b.dirty && b.block.is_some())
    }

    pub fn has_dirty(&self) -> bool {
        self.buffers.iter().any(|b| b.dirty)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}
