//! Incremental UTF-8 decoding of a chunked response body
//!
//! A multi-byte character may be split across two network chunks. Decoding
//! each chunk on its own would turn both halves into replacement characters,
//! so the decoder keeps the incomplete tail of one chunk and prepends it to
//! the next.

use thiserror::Error;

/// U+FFFD, substituted for invalid input in lossy mode
const REPLACEMENT: char = '\u{FFFD}';
const BOM: char = '\u{FEFF}';

/// Invalid UTF-8 met in strict mode
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A byte sequence that can never become valid
    #[error("invalid UTF-8 sequence at byte {offset} of the stream")]
    InvalidSequence {
        /// Offset from the start of the stream
        offset: usize,
    },

    /// The stream ended in the middle of a character
    #[error("stream ended inside a {pending}-byte partial UTF-8 sequence")]
    TruncatedSequence {
        /// Bytes left over at end of stream
        pending: usize,
    },
}

/// Stateful UTF-8 decoder
///
/// Lossy by default: invalid sequences become U+FFFD and a leading byte
/// order mark is dropped. [`Utf8StreamDecoder::strict`] reports invalid
/// input as an error instead.
#[derive(Debug, Clone, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
    consumed: usize,
    strict: bool,
    started: bool,
}

impl Utf8StreamDecoder {
    /// Lossy decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder that fails on invalid input
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    /// Bytes held back waiting for the rest of a character
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Decode the next chunk
    ///
    /// Returns all text that is complete after this chunk; an incomplete
    /// trailing sequence is retained for the next call.
    ///
    /// # Errors
    ///
    /// In strict mode, returns `DecodeError::InvalidSequence` when the
    /// input contains bytes that can never form valid UTF-8.
    pub fn decode(&mut self, chunk: &[u8]) -> Result<String, DecodeError> {
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(chunk);

        let base = self.consumed;
        let mut out = String::with_capacity(input.len());
        let mut rest: &[u8] = &input;

        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    rest = &[];
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    // The prefix is valid, so no replacement happens here.
                    out.push_str(&String::from_utf8_lossy(&rest[..valid]));
                    match err.error_len() {
                        Some(len) => {
                            if self.strict {
                                let offset = base + (input.len() - rest.len()) + valid;
                                return Err(DecodeError::InvalidSequence { offset });
                            }
                            out.push(REPLACEMENT);
                            rest = &rest[valid + len..];
                        }
                        None => {
                            rest = &rest[valid..];
                            break;
                        }
                    }
                }
            }
        }

        self.pending = rest.to_vec();
        self.consumed = base + input.len() - self.pending.len();
        Ok(self.strip_bom(out))
    }

    /// Flush the decoder at end of stream
    ///
    /// # Errors
    ///
    /// In strict mode, returns `DecodeError::TruncatedSequence` if the
    /// stream stopped in the middle of a character.
    pub fn finish(&mut self) -> Result<String, DecodeError> {
        if self.pending.is_empty() {
            return Ok(String::new());
        }
        let pending = std::mem::take(&mut self.pending);
        self.consumed += pending.len();
        if self.strict {
            return Err(DecodeError::TruncatedSequence {
                pending: pending.len(),
            });
        }
        Ok(self.strip_bom(REPLACEMENT.to_string()))
    }

    fn strip_bom(&mut self, text: String) -> String {
        if self.started || text.is_empty() {
            return text;
        }
        self.started = true;
        match text.strip_prefix(BOM) {
            Some(stripped) => stripped.to_string(),
            None => text,
        }
    }
}
