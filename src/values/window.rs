//! Sliding window over the value file

/// In-memory copy of one aligned byte range of the value file
#[derive(Debug)]
pub struct Window {
    /// Window contents
    pub data: Box<[u8]>,
    /// File offset of `data[0]`, `None` until the first load
    pub offset: Option<u64>,
    /// Contents differ from the file
    pub dirty: bool,
}

impl Window {
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0u8; size].into_boxed_slice(),
            offset: None,
            dirty: false,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Window-aligned start of the range containing `pos`
    pub fn start_of(&self, pos: u64) -> u64 {
        pos - pos % self.data.len() as u64
    }

    /// Whether `pos` lies inside the loaded range
    pub fn covers(&self, pos: u64) -> bool {
        self.offset == Some(self.start_of(pos))
    }
}
