//! Loader configuration.

use layerpack_decode::{DEFAULT_SCRATCH_LEN, DecodeResult, words_from_le_bytes, words_from_utf8};
use serde::{Deserialize, Serialize};

/// How encoded buffer files store their 16-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordEncoding {
    /// UTF-8 text, one UTF-16 code unit per word.
    #[default]
    Utf8,
    /// Raw little-endian words.
    Utf16Le,
}

impl WordEncoding {
    /// Convert raw file bytes into words.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not valid for this encoding.
    pub fn decode(self, bytes: &[u8]) -> DecodeResult<Vec<u16>> {
        match self {
            WordEncoding::Utf8 => words_from_utf8(bytes),
            WordEncoding::Utf16Le => words_from_le_bytes(bytes),
        }
    }
}

/// Tunables for a [`LayersLoader`](crate::LayersLoader).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderOptions {
    /// Scratch buffer length in words, clamped to
    /// [`MAX_SCRATCH_LEN`](layerpack_decode::MAX_SCRATCH_LEN) and rounded up to
    /// whole vertices.
    pub scratch_len: usize,
    /// Storage format of encoded buffer files.
    pub word_encoding: WordEncoding,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            scratch_len: DEFAULT_SCRATCH_LEN,
            word_encoding: WordEncoding::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults_fill_missing_fields() {
        let options: LoaderOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, LoaderOptions::default());

        let options: LoaderOptions =
            serde_json::from_str(r#"{ "word_encoding": "utf16_le" }"#).unwrap();
        assert_eq!(options.word_encoding, WordEncoding::Utf16Le);
        assert_eq!(options.scratch_len, DEFAULT_SCRATCH_LEN);
    }

    #[test]
    fn test_word_encoding_decode() {
        assert_eq!(WordEncoding::Utf8.decode(b"\x01\x02"), Ok(vec![1, 2]));
        assert_eq!(WordEncoding::Utf16Le.decode(&[1, 0, 2, 0]), Ok(vec![1, 2]));
    }
}
