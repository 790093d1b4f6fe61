//! Incremental UTF-8 decoding.
//!
//! HTTP bodies arrive in arbitrary byte chunks, so a multi-byte character can
//! straddle two reads. [`Utf8Decoder`] holds the incomplete tail of one chunk
//! and completes it with the head of the next. Invalid sequences are replaced
//! with U+FFFD, and a leading byte order mark is dropped, matching how
//! browsers decode streamed text.

const REPLACEMENT: char = '\u{FFFD}';
const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Stateful UTF-8 decoder that is safe across chunk boundaries.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
    bom_checked: bool,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `bytes`, appending the complete characters to `out`.
    ///
    /// A trailing incomplete sequence is kept and prepended to the next call.
    /// A byte order mark at the very start of the input is skipped, even when
    /// it arrives split over several calls.
    ///
    /// # Example
    /// ```
    /// use homework_client::utf8::Utf8Decoder;
    ///
    /// let mut decoder = Utf8Decoder::new();
    /// let mut out = String::new();
    /// let bytes = "é".as_bytes();
    /// decoder.decode_into(&bytes[..1], &mut out);
    /// assert_eq!(out, "");
    /// decoder.decode_into(&bytes[1..], &mut out);
    /// assert_eq!(out, "é");
    /// ```
    pub fn decode_into(&mut self, bytes: &[u8], out: &mut String) {
        let joined;
        let mut input = if self.pending.is_empty() {
            bytes
        } else {
            let mut held = std::mem::take(&mut self.pending);
            held.extend_from_slice(bytes);
            joined = held;
            joined.as_slice()
        };

        if !self.bom_checked {
            if input.len() < BOM.len() && BOM.starts_with(input) {
                // Too short to tell yet.
                self.pending.extend_from_slice(input);
                return;
            }
            self.bom_checked = true;
            input = input.strip_prefix(BOM).unwrap_or(input);
        }

        self.decode_slice(input, out);
    }

    /// Flush whatever incomplete sequence is still held.
    ///
    /// A dangling partial character becomes a single U+FFFD.
    pub fn finish(&mut self, out: &mut String) {
        if !self.pending.is_empty() {
            self.pending.clear();
            out.push(REPLACEMENT);
        }
    }

    /// Whether an incomplete sequence is waiting for more bytes.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn decode_slice(&mut self, mut input: &[u8], out: &mut String) {
        loop {
            match std::str::from_utf8(input) {
                Ok(valid) => {
                    out.push_str(valid);
                    return;
                }
                Err(err) => {
                    let (valid, rest) = input.split_at(err.valid_up_to());
                    // `valid_up_to` marks a verified prefix, so this never falls back.
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match err.error_len() {
                        Some(len) => {
                            out.push(REPLACEMENT);
                            input = &rest[len..];
                        }
                        None => {
                            // Incomplete sequence at the end of the input.
                            self.pending.extend_from_slice(rest);
                            return;
                        }
                    }
                }
            }
        }
    }
}
