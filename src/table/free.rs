//! Free-page bitmap
//!
//! One bit per physical block: set while a block is referenced by the
//! boundary index, clear once it has been released by a delete.

/// Occupancy bitmap over physical block numbers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreePages {
    words: Vec<u64>,
}

impl FreePages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the bitmap from persisted words
    pub fn from_words(words: Vec<u64>) -> Self {
        Self { words }
    }

    /// Rebuild the bitmap from the blocks referenced by the index
    pub fn from_blocks(blocks: &[usize]) -> Self {
        let mut pages = Self::new();
        for &block in blocks {
            pages.set(block);
        }
        pages
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    pub fn is_set(&self, block: usize) -> bool {
        self.words
            .get(block / 64)
            .map_or(false, |w| w & (1 << (block % 64)) != 0)
    }

    /// Mark `block` as occupied
    pub fn set(&mut self, block: usize) {
        let word = block / 64;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1 << (block % 64);
    }

    /// Mark `block` as free
    pub fn clear(&mut self, block: usize) {
        if let Some(w) = self.words.get_mut(block / 64) {
            *w &= !(1 << (block % 64));
        }
    }

    /// Lowest free block number (may lie past the end of the file)
    pub fn next_free(&self) -> usize {
        for (i, &w) in self.words.iter().enumerate() {
            if w != u64::MAX {
                return i * 64 + (!w).trailing_zeros() as usize;
            }
        }
        self.words.len() * 64
    }

    /// Number of occupied blocks
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}
