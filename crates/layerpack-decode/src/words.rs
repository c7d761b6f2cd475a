//! Conversion of raw resource bytes into 16-bit word streams.
//!
//! Encoded buffer files are stored as UTF-8 text in which every UTF-16 code
//! unit carries one encoded word. This keeps small words (the common case
//! for zigzag deltas) to a single byte on disk. Pre-converted files may
//! instead hold raw little-endian words.

use crate::error::{DecodeError, DecodeResult};

/// Decode UTF-8 bytes into the UTF-16 code units they spell.
///
/// # Errors
///
/// Returns an error if `bytes` is not valid UTF-8.
pub fn words_from_utf8(bytes: &[u8]) -> DecodeResult<Vec<u16>> {
    let text = std::str::from_utf8(bytes).map_err(|e| DecodeError::InvalidFormat {
        context: "utf-8 word stream",
        detail: e.to_string(),
    })?;
    Ok(text.encode_utf16().collect())
}

/// Read raw little-endian 16-bit words.
///
/// # Errors
///
/// Returns an error if `bytes` has an odd length.
pub fn words_from_le_bytes(bytes: &[u8]) -> DecodeResult<Vec<u16>> {
    if !bytes.len().is_multiple_of(2) {
        return Err(DecodeError::InvalidFormat {
            context: "little-endian word stream",
            detail: format!("byte length {} is odd", bytes.len()),
        });
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Serialize words as UTF-8 text, the inverse of [`words_from_utf8`].
///
/// Returns `None` if the words contain unpaired surrogates, which cannot be
/// represented in UTF-8.
#[must_use]
pub fn words_to_utf8(words: &[u16]) -> Option<Vec<u8>> {
    String::from_utf16(words).ok().map(String::into_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_from_utf8_ascii() {
        let words = words_from_utf8(b"\x00\x05A").unwrap();
        assert_eq!(words, vec![0, 5, 65]);
    }

    #[test]
    fn test_words_from_utf8_multibyte() {
        // U+00E9 (2 bytes) and U+4E2D (3 bytes) each become one word.
        let words = words_from_utf8("\u{e9}\u{4e2d}".as_bytes()).unwrap();
        assert_eq!(words, vec![0xE9, 0x4E2D]);
    }

    #[test]
    fn test_words_from_utf8_invalid() {
        let result = words_from_utf8(&[0xFF, 0xFE]);
        assert!(matches!(result, Err(DecodeError::InvalidFormat { .. })));
    }

    #[test]
    fn test_words_from_le_bytes() {
        let words = words_from_le_bytes(&[0x34, 0x12, 0xFF, 0x00]).unwrap();
        assert_eq!(words, vec![0x1234, 0x00FF]);
    }

    #[test]
    fn test_words_from_le_bytes_odd() {
        let result = words_from_le_bytes(&[1, 2, 3]);
        assert!(matches!(result, Err(DecodeError::InvalidFormat { .. })));
    }

    #[test]
    fn test_words_to_utf8_round_trip() {
        let words = vec![1, 200, 3000, 40000];
        let bytes = words_to_utf8(&words).unwrap();
        assert_eq!(words_from_utf8(&bytes).unwrap(), words);
    }

    #[test]
    fn test_words_to_utf8_rejects_lone_surrogate() {
        assert!(words_to_utf8(&[0xD800]).is_none());
    }
}
