use crate::error::{FsError, Result};

#[derive(Debug, PartialEq)]
pub enum State {
    Free,
    Used,
}

/// Tracks which block indices are in use, one bit per block, packed into
/// `u64` words. Allocation is strict first-fit: the lowest clear bit wins
/// every time, so the reuse order after frees is deterministic.
pub struct Bitmap {
    words: Vec<u64>,
    nbits: usize,
}

impl Bitmap {
    pub fn new(nbits: usize) -> Self {
        Bitmap {
            words: vec![0; (nbits + 63) / 64],
            nbits,
        }
    }

    pub fn get(&self, blocknr: usize) -> State {
        assert!(blocknr < self.nbits);
        let mask = 1u64 << (blocknr % 64);
        if self.words[blocknr / 64] & mask == 0 {
            State::Free
        } else {
            State::Used
        }
    }

    fn set_used(&mut self, blocknr: usize) {
        let mask = 1u64 << (blocknr % 64);
        self.words[blocknr / 64] |= mask;
    }

    fn set_free(&mut self, blocknr: usize) {
        let mask = 1u64 << (blocknr % 64);
        self.words[blocknr / 64] &= !mask;
    }

    /// Marks the lowest free index as used and returns it.
    ///
    /// # Errors
    ///
    /// Fails once every index is in use.
    pub fn allocate(&mut self) -> Result<usize> {
        for w in 0..self.words.len() {
            let word = self.words[w];
            if word != u64::MAX {
                let blocknr = w * 64 + word.trailing_ones() as usize;
                // The spare high bits of the last word are always clear, so a
                // hit past nbits means every real index is taken.
                if blocknr >= self.nbits {
                    break;
                }
                self.set_used(blocknr);
                return Ok(blocknr);
            }
        }
        Err(FsError::OutOfBlocks)
    }

    /// Clears the bit for `blocknr`. Releasing an index that is already free
    /// is a no-op.
    pub fn release(&mut self, blocknr: usize) {
        assert!(blocknr < self.nbits);
        self.set_free(blocknr);
    }

    pub fn used_count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn free_count(&self) -> usize {
        self.nbits - self.used_count()
    }

    /// Little-endian word dump for the image codec.
    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.words.len() * 8);
        for word in &self.words {
            out.extend_from_slice(&word.to_le_bytes());
        }
        out
    }

    /// Rebuilds a bitmap for `nbits` blocks from an image dump.
    ///
    /// # Errors
    ///
    /// The dump must be exactly the expected word count and must not set any
    /// bit past `nbits`; anything else is image corruption.
    pub(crate) fn from_bytes(buf: &[u8], nbits: usize) -> Result<Self> {
        use std::convert::TryInto;

        let expected_words = (nbits + 63) / 64;
        if buf.len() != expected_words * 8 {
            return Err(FsError::ImageCorrupt(format!(
                "bitmap is {} bytes, expected {}",
                buf.len(),
                expected_words * 8
            )));
        }
        let words: Vec<u64> = buf
            .chunks_exact(8)
            .map(|c| u64::from_le_bytes(c.try_into().unwrap()))
            .collect();
        if let Some(last) = words.last() {
            let spare = expected_words * 64 - nbits;
            if spare > 0 && *last >> (64 - spare) != 0 {
                return Err(FsError::ImageCorrupt(
                    "bitmap sets bits past the block count".to_string(),
                ));
            }
        }
        Ok(Bitmap { words, nbits })
    }
}
