//! Decode zigzag-delta encoded mesh streams.
//!
//! This crate provides pure synchronous decoding functions that rebuild
//! index and vertex buffers from 16-bit word streams. All functions are
//! designed to be called from any threading context - the caller owns the
//! [`ScratchBuffer`] and decides how to schedule work.
//!
//! # Design principles
//!
//! - **Synchronous**: No async, no threading primitives
//! - **No hidden state**: Scratch space is passed in explicitly
//! - **Wrapping arithmetic**: Accumulators overflow exactly like the encoder
//!
//! # Key functions
//!
//! - [`decode_indices`]: Single-accumulator delta decode of index streams
//! - [`decode_vertices`]: 8-slot interleaved delta decode with per-slot transforms
//! - [`words_from_utf8`]: Turn a UTF-8 encoded resource into its word stream

mod error;
mod scratch;

pub mod indices;
pub mod vertices;
pub mod words;
pub mod zigzag;

pub use error::{DecodeError, DecodeResult};
pub use indices::{decode_indices, encode_indices};
pub use scratch::{DEFAULT_SCRATCH_LEN, MAX_SCRATCH_LEN, ScratchBuffer};
pub use vertices::{decode_vertices, encode_vertices, vertex_count};
pub use words::{words_from_le_bytes, words_from_utf8, words_to_utf8};
pub use zigzag::{zigzag_decode, zigzag_encode};

/// Interleaved components per vertex: 3 position, 3 normal, 2 texcoord.
pub const COMPONENTS_PER_VERTEX: usize = 8;

/// Borrow `words[start..start + length]`, or report how far short it falls.
fn span(words: &[u16], start: usize, length: usize) -> DecodeResult<&[u16]> {
    let end = start.saturating_add(length);
    words.get(start..end).ok_or(DecodeError::BufferTooSmall {
        expected: end,
        actual: words.len(),
    })
}
