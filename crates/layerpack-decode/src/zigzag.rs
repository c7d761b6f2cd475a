//! Zigzag mapping between signed deltas and unsigned 16-bit words.

/// Decode a zigzag word into the raw two's-complement bits of its delta.
///
/// Accumulators add these bits with wrapping arithmetic, so the signed
/// interpretation is never needed on the hot path.
#[inline]
pub(crate) fn delta_bits(word: u16) -> u16 {
    (word >> 1) ^ (word & 1).wrapping_neg()
}

/// Decode a zigzag-encoded word into a signed delta.
///
/// `0 -> 0, 1 -> -1, 2 -> 1, 3 -> -2, ...`
#[must_use]
#[inline]
#[allow(clippy::cast_possible_wrap)]
pub fn zigzag_decode(word: u16) -> i16 {
    delta_bits(word) as i16
}

/// Encode a signed delta as a zigzag word.
#[must_use]
#[inline]
#[allow(clippy::cast_sign_loss)]
pub fn zigzag_encode(delta: i16) -> u16 {
    ((delta << 1) ^ (delta >> 15)) as u16
}
