use crate::error::{FsError, Result};

/// Default block size in bytes. Small blocks keep images compact for the
/// interactive, text-sized workloads this store targets.
pub const DEFAULT_BLOCK_SIZE: usize = 256;

/// A fixed-capacity array of equally sized blocks backed by one contiguous
/// zero-initialized byte arena. Blocks are addressed by index and mutated in
/// place; the arena is never resized after construction.
pub struct BlockStore {
    data: Vec<u8>,
    block_size: usize,
    block_count: usize,
}

impl BlockStore {
    pub fn new(block_count: usize, block_size: usize) -> Self {
        assert!(block_size > 0, "block size must be non-zero");
        BlockStore {
            data: vec![0; block_count * block_size],
            block_size,
            block_count,
        }
    }

    pub fn block_count(&self) -> usize {
        self.block_count
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Copies `buf` into block `blocknr` starting at `offset`. Bytes that
    /// would cross the block boundary are silently dropped; the number of
    /// bytes actually kept is returned.
    ///
    /// # Errors
    ///
    /// Attempting to write a block out of range returns an error.
    pub fn write(&mut self, blocknr: usize, offset: usize, buf: &[u8]) -> Result<usize> {
        if blocknr >= self.block_count {
            return Err(FsError::BlockOutOfRange(blocknr));
        }
        let writable = buf.len().min(self.block_size.saturating_sub(offset));
        if writable == 0 {
            return Ok(0);
        }
        let start = blocknr * self.block_size + offset;
        self.data[start..start + writable].copy_from_slice(&buf[..writable]);
        Ok(writable)
    }

    /// Reads up to `len` bytes from block `blocknr` starting at `offset`.
    /// The slice is shorter than `len` when the request crosses the block
    /// boundary.
    ///
    /// # Errors
    ///
    /// Attempting to read a block out of range returns an error.
    pub fn read(&self, blocknr: usize, offset: usize, len: usize) -> Result<&[u8]> {
        if blocknr >= self.block_count {
            return Err(FsError::BlockOutOfRange(blocknr));
        }
        let readable = len.min(self.block_size.saturating_sub(offset));
        if readable == 0 {
            return Ok(&[]);
        }
        let start = blocknr * self.block_size + offset;
        Ok(&self.data[start..start + readable])
    }

    /// Raw view of the whole arena in block order, for the image codec.
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Rebuilds a store from an arena read out of an image. The caller has
    /// already sized `data` to exactly `block_count * block_size` bytes.
    pub(crate) fn from_raw(data: Vec<u8>, block_count: usize, block_size: usize) -> Self {
        debug_assert_eq!(data.len(), block_count * block_size);
        BlockStore {
            data,
            block_size,
            block_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_read_back_written_bytes() {
        let mut store = BlockStore::new(4, 16);
        store.write(2, 0, b"hello").unwrap();
        assert_eq!(store.read(2, 0, 5).unwrap(), b"hello");
        // An untouched block stays zeroed.
        assert_eq!(store.read(3, 0, 5).unwrap(), &[0; 5][..]);
    }

    #[test]
    fn writes_are_clipped_at_the_block_boundary() {
        let mut store = BlockStore::new(2, 4);
        let kept = store.write(0, 2, b"abcdef").unwrap();
        assert_eq!(kept, 2);
        assert_eq!(store.read(0, 0, 4).unwrap(), b"\0\0ab");
        // The neighboring block is untouched.
        assert_eq!(store.read(1, 0, 4).unwrap(), &[0; 4][..]);
    }

    #[test]
    fn reads_are_clipped_at_the_block_boundary() {
        let mut store = BlockStore::new(1, 4);
        store.write(0, 0, b"abcd").unwrap();
        assert_eq!(store.read(0, 2, 100).unwrap(), b"cd");
        assert_eq!(store.read(0, 4, 1).unwrap(), b"");
    }

    #[test]
    fn out_of_range_block_is_an_error() {
        let mut store = BlockStore::new(2, 4);
        assert!(store.write(2, 0, b"x").is_err());
        assert!(store.read(2, 0, 1).is_err());
    }

    #[test]
    fn offset_past_block_size_writes_nothing() {
        let mut store = BlockStore::new(1, 4);
        assert_eq!(store.write(0, 9, b"abc").unwrap(), 0);
        assert_eq!(store.read(0, 0, 4).unwrap(), &[0; 4][..]);
    }
}
