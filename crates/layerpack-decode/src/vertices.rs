//! Vertex attribute stream decoding.
//!
//! Vertices are stored as 8 interleaved 16-bit components:
//!
//! | slot | component    | transform             |
//! |------|--------------|-----------------------|
//! | 0    | position.x   | `value - 8192`        |
//! | 1    | position.y   | `value - 4096`        |
//! | 2    | position.z   | `value - 8192`        |
//! | 3-5  | normal.xyz   | `(value - 256) << 7`  |
//! | 6    | texcoord.u   | `value`               |
//! | 7    | texcoord.v   | `512 - value`         |
//!
//! Each slot has its own delta accumulator.

use crate::error::{DecodeError, DecodeResult};
use crate::scratch::ScratchBuffer;
use crate::zigzag::{delta_bits, zigzag_encode};
use crate::{COMPONENTS_PER_VERTEX, span};

/// Apply the per-slot transform to an accumulated component.
///
/// Operates on raw 16-bit patterns; the result is reinterpreted as `i16`.
#[inline]
fn transform_slot(slot: usize, value: u16) -> u16 {
    match slot {
        0 | 2 => value.wrapping_sub(8192),
        1 => value.wrapping_sub(4096),
        3..=5 => value.wrapping_sub(256).wrapping_shl(7),
        6 => value,
        // Images are not flipped at upload, so V is flipped here.
        _ => 512_u16.wrapping_sub(value),
    }
}

/// Decode `length` zigzag-delta encoded vertex components starting at `start`.
///
/// `length` counts components, not vertices, and must be a multiple of
/// [`COMPONENTS_PER_VERTEX`]. The returned buffer is the interleaved,
/// transformed fixed-point vertex data.
///
/// # Errors
///
/// Returns an error if `length` does not describe whole vertices or the span
/// runs past the end of `words`.
#[allow(clippy::cast_possible_wrap)]
pub fn decode_vertices(
    words: &[u16],
    start: usize,
    length: usize,
    scratch: &mut ScratchBuffer,
) -> DecodeResult<Vec<i16>> {
    if length == 0 {
        return Ok(Vec::new());
    }

    if !length.is_multiple_of(COMPONENTS_PER_VERTEX) {
        return Err(DecodeError::InvalidFormat {
            context: "vertices",
            detail: format!(
                "component count {length} is not a multiple of {COMPONENTS_PER_VERTEX}"
            ),
        });
    }

    let encoded = span(words, start, length)?;
    let mut vertices = Vec::with_capacity(length);
    let mut prev = [0_u16; COMPONENTS_PER_VERTEX];

    // Scratch length is a multiple of the vertex size, so chunks hold whole vertices.
    for block in encoded.chunks(scratch.len()) {
        let chunk = scratch.chunk_mut(block.len());
        for (out, vertex) in chunk
            .chunks_exact_mut(COMPONENTS_PER_VERTEX)
            .zip(block.chunks_exact(COMPONENTS_PER_VERTEX))
        {
            for slot in 0..COMPONENTS_PER_VERTEX {
                prev[slot] = prev[slot].wrapping_add(delta_bits(vertex[slot]));
                out[slot] = transform_slot(slot, prev[slot]);
            }
        }
        vertices.extend(chunk.iter().map(|&bits| bits as i16));
    }

    Ok(vertices)
}

/// Encode raw (pre-transform) vertex components as a zigzag-delta stream.
///
/// `components` is interleaved like the decoded output but holds the values
/// the accumulators should reach, before the per-slot transform.
///
/// # Panics
///
/// Panics if `components` does not hold whole vertices.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn encode_vertices(components: &[u16]) -> Vec<u16> {
    assert!(
        components.len().is_multiple_of(COMPONENTS_PER_VERTEX),
        "vertex components must come in groups of {COMPONENTS_PER_VERTEX}"
    );

    let mut prev = [0_u16; COMPONENTS_PER_VERTEX];
    let mut words = Vec::with_capacity(components.len());
    for vertex in components.chunks_exact(COMPONENTS_PER_VERTEX) {
        for slot in 0..COMPONENTS_PER_VERTEX {
            words.push(zigzag_encode(vertex[slot].wrapping_sub(prev[slot]) as i16));
            prev[slot] = vertex[slot];
        }
    }
    words
}

/// Number of vertices in an interleaved vertex buffer.
#[must_use]
pub fn vertex_count(components: usize) -> usize {
    components / COMPONENTS_PER_VERTEX
}
