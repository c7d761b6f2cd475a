//! Reusable decode scratch space.

use crate::COMPONENTS_PER_VERTEX;

/// Default scratch length in words.
pub const DEFAULT_SCRATCH_LEN: usize = 8192;

/// Largest scratch length in words; longer requests are clamped.
pub const MAX_SCRATCH_LEN: usize = 1 << 20;

/// Session-scoped scratch buffer shared by every decode call of one load.
///
/// Decoders fill the buffer one chunk at a time and append each chunk to
/// their output in bulk. The chunk size only affects throughput, never the
/// decoded values. Pass it by `&mut`; it is not meant to be shared between
/// concurrent sessions.
#[derive(Debug)]
pub struct ScratchBuffer {
    words: Box<[u16]>,
    chunks_decoded: u64,
}

impl ScratchBuffer {
    /// Create a scratch buffer of [`DEFAULT_SCRATCH_LEN`] words.
    #[must_use]
    pub fn new() -> Self {
        Self::with_len(DEFAULT_SCRATCH_LEN)
    }

    /// Create a scratch buffer of roughly `len` words.
    ///
    /// The length is clamped to `COMPONENTS_PER_VERTEX..=MAX_SCRATCH_LEN` and
    /// rounded up to a whole number of vertices so vertex chunks never split a
    /// vertex.
    #[must_use]
    pub fn with_len(len: usize) -> Self {
        let len = len
            .clamp(COMPONENTS_PER_VERTEX, MAX_SCRATCH_LEN)
            .next_multiple_of(COMPONENTS_PER_VERTEX);
        Self {
            words: vec![0; len].into_boxed_slice(),
            chunks_decoded: 0,
        }
    }

    /// Capacity of one chunk in words.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Always false; a scratch buffer holds at least one vertex.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Number of chunks written through this buffer so far.
    #[must_use]
    pub fn chunks_decoded(&self) -> u64 {
        self.chunks_decoded
    }

    /// Borrow the first `len` words for writing one chunk.
    pub(crate) fn chunk_mut(&mut self, len: usize) -> &mut [u16] {
        self.chunks_decoded += 1;
        &mut self.words[..len]
    }
}

impl Default for ScratchBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_len_rounds_to_vertex() {
        assert_eq!(ScratchBuffer::with_len(0).len(), 8);
        assert_eq!(ScratchBuffer::with_len(9).len(), 16);
        assert_eq!(ScratchBuffer::with_len(64).len(), 64);
    }

    #[test]
    fn test_with_len_clamps_extremes() {
        assert_eq!(ScratchBuffer::with_len(usize::MAX).len(), MAX_SCRATCH_LEN);
        assert_eq!(
            ScratchBuffer::with_len(MAX_SCRATCH_LEN + 1).len(),
            MAX_SCRATCH_LEN
        );
        assert_eq!(ScratchBuffer::with_len(usize::MAX / 2).len(), MAX_SCRATCH_LEN);
        assert_eq!(ScratchBuffer::with_len(0).len(), COMPONENTS_PER_VERTEX);
    }

    #[test]
    fn test_chunk_counter() {
        let mut scratch = ScratchBuffer::with_len(16);
        assert_eq!(scratch.chunks_decoded(), 0);
        let chunk = scratch.chunk_mut(4);
        assert_eq!(chunk.len(), 4);
        assert_eq!(scratch.chunks_decoded(), 1);
    }
}
