//! Index stream decoding.

use crate::error::DecodeResult;
use crate::scratch::ScratchBuffer;
use crate::span;
use crate::zigzag::{delta_bits, zigzag_encode};

/// Decode `length` zigzag-delta encoded indices starting at word `start`.
///
/// A single accumulator runs across the whole stream: each word is a signed
/// delta from the previous index. Arithmetic wraps at 16 bits, matching the
/// encoder.
///
/// # Errors
///
/// Returns [`DecodeError::BufferTooSmall`](crate::DecodeError::BufferTooSmall)
/// if the span runs past the end of `words`.
pub fn decode_indices(
    words: &[u16],
    start: usize,
    length: usize,
    scratch: &mut ScratchBuffer,
) -> DecodeResult<Vec<u16>> {
    if length == 0 {
        return Ok(Vec::new());
    }

    let encoded = span(words, start, length)?;
    let mut indices = Vec::with_capacity(length);
    let mut prev: u16 = 0;

    for block in encoded.chunks(scratch.len()) {
        let chunk = scratch.chunk_mut(block.len());
        for (out, &word) in chunk.iter_mut().zip(block) {
            prev = prev.wrapping_add(delta_bits(word));
            *out = prev;
        }
        indices.extend_from_slice(chunk);
    }

    Ok(indices)
}

/// Encode absolute indices as a zigzag-delta word stream.
///
/// Inverse of [`decode_indices`]; used to build fixtures and test data.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn encode_indices(indices: &[u16]) -> Vec<u16> {
    let mut prev: u16 = 0;
    indices
        .iter()
        .map(|&index| {
            let delta = index.wrapping_sub(prev) as i16;
            prev = index;
            zigzag_encode(delta)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DecodeError;
    use proptest::prelude::*;

    #[test]
    fn test_decode_indices_deltas() {
        // Deltas +5, -3, +10.
        let words = [10, 5, 20];
        let mut scratch = ScratchBuffer::new();
        let result = decode_indices(&words, 0, 3, &mut scratch).unwrap();
        assert_eq!(result, vec![5, 2, 12]);
    }

    #[test]
    fn test_decode_indices_empty_does_not_touch_scratch() {
        let words = [10, 5, 20];
        let mut scratch = ScratchBuffer::new();
        let result = decode_indices(&words, 1, 0, &mut scratch).unwrap();
        assert!(result.is_empty());
        assert_eq!(scratch.chunks_decoded(), 0);

        // Zero length is fine even past the end of the stream.
        let result = decode_indices(&[], 100, 0, &mut scratch).unwrap();
        assert!(result.is_empty());
        assert_eq!(scratch.chunks_decoded(), 0);
    }

    #[test]
    fn test_decode_indices_offset() {
        // Leading junk is skipped; accumulator starts from zero at `start`.
        let words = [999, 999, 10, 5, 20];
        let mut scratch = ScratchBuffer::new();
        let result = decode_indices(&words, 2, 3, &mut scratch).unwrap();
        assert_eq!(result, vec![5, 2, 12]);
    }

    #[test]
    fn test_decode_indices_wraps() {
        // -1 from zero wraps to 65535.
        let words = [1, 2];
        let mut scratch = ScratchBuffer::new();
        let result = decode_indices(&words, 0, 2, &mut scratch).unwrap();
        assert_eq!(result, vec![u16::MAX, 0]);
    }

    #[test]
    fn test_decode_indices_out_of_range() {
        let words = [10, 5, 20];
        let mut scratch = ScratchBuffer::new();
        let result = decode_indices(&words, 2, 2, &mut scratch);
        assert_eq!(
            result,
            Err(DecodeError::BufferTooSmall {
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn test_decode_indices_across_chunks() {
        let indices: Vec<u16> = (0..100).map(|i| (i * 7) % 31).collect();
        let words = encode_indices(&indices);

        // Smallest scratch forces many chunks; accumulator must carry over.
        let mut scratch = ScratchBuffer::with_len(8);
        let result = decode_indices(&words, 0, words.len(), &mut scratch).unwrap();
        assert_eq!(result, indices);
        assert_eq!(scratch.chunks_decoded(), 13);
    }

    proptest! {
        #[test]
        fn prop_chunk_size_does_not_change_result(
            indices in proptest::collection::vec(any::<u16>(), 0..200),
            scratch_len in 1_usize..64,
        ) {
            let words = encode_indices(&indices);
            let mut small = ScratchBuffer::with_len(scratch_len);
            let mut large = ScratchBuffer::new();
            let a = decode_indices(&words, 0, words.len(), &mut small).unwrap();
            let b = decode_indices(&words, 0, words.len(), &mut large).unwrap();
            prop_assert_eq!(&a, &indices);
            prop_assert_eq!(a, b);
        }
    }
}
