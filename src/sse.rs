//! Server-Sent Events (SSE) frame decoding.
//!
//! The chat endpoints stream newline-delimited frames:
//! ```text
//! data: {"choices": [{"delta": {"content": "Hel"}}]}
//! data: {"choices": [{"delta": {"content": "lo"}}]}
//! data: [DONE]
//! ```
//!
//! [`FrameDecoder`] is the I/O-free core: it owns the text buffer, splits it
//! into lines and resolves each line into a [`Frame`]. The async drivers
//! ([`crate::session::decode_stream`] and [`SseResponseExt`]) only move bytes
//! into it.

use futures::stream::{self, Stream, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::ClientError;
use crate::utf8::Utf8Decoder;

/// Prefix of every payload-carrying line.
pub const DATA_PREFIX: &str = "data: ";

/// Payload that marks the normal end of the stream.
pub const DONE_MARKER: &str = "[DONE]";

/// A resolved unit of the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// A parsed JSON payload.
    Payload(Value),
    /// The `[DONE]` sentinel. Nothing after it is decoded.
    Done,
}

/// Incremental line decoder for `data: ` framed streams.
///
/// Feed it bytes with [`push_bytes`](Self::push_bytes), drain frames with
/// [`next_frame`](Self::next_frame), and call [`close`](Self::close) once the
/// transport has no more data so the trailing unterminated line is resolved.
///
/// # Example
/// ```
/// use homework_client::sse::{Frame, FrameDecoder};
/// use serde_json::json;
///
/// let mut decoder = FrameDecoder::new();
/// decoder.push_bytes(b"data: {\"a\":");
/// assert_eq!(decoder.next_frame(), None);
///
/// decoder.push_bytes(b"1}\ndata: [DONE]\n");
/// assert_eq!(decoder.next_frame(), Some(Frame::Payload(json!({"a": 1}))));
/// assert_eq!(decoder.next_frame(), Some(Frame::Done));
/// assert!(decoder.is_done());
/// ```
#[derive(Debug, Default)]
pub struct FrameDecoder {
    text: Utf8Decoder,
    buffer: String,
    closed: bool,
    done: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes from the transport.
    ///
    /// Ignored once the decoder is closed or has seen the sentinel.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        if self.closed || self.done {
            return;
        }
        self.text.decode_into(bytes, &mut self.buffer);
    }

    /// Append already-decoded text.
    pub fn push_str(&mut self, text: &str) {
        if self.closed || self.done {
            return;
        }
        self.buffer.push_str(text);
    }

    /// Signal that the transport is exhausted.
    ///
    /// Any partial character still held by the UTF-8 decoder is flushed into
    /// the buffer. The next call to [`next_frame`](Self::next_frame) that finds
    /// no complete line resolves the remaining residue.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.text.finish(&mut self.buffer);
    }

    /// Resolve the next frame, if one is available.
    ///
    /// Lines without the `data: ` prefix and payloads that are not valid JSON
    /// are skipped. Returns `None` when more input is needed, or permanently
    /// once [`is_done`](Self::is_done) is true.
    pub fn next_frame(&mut self) -> Option<Frame> {
        if self.done {
            return None;
        }

        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            let line = &line[..pos];

            let Some(data) = parse_sse_line(line) else {
                continue;
            };

            if is_done_marker(data) {
                self.done = true;
                self.buffer.clear();
                return Some(Frame::Done);
            }

            match serde_json::from_str::<Value>(data) {
                Ok(value) => return Some(Frame::Payload(value)),
                Err(e) => {
                    warn!(error = %e, frame = data, "skipping malformed stream frame");
                }
            }
        }

        if self.closed {
            self.done = true;
            return self.take_residue();
        }

        None
    }

    /// Whether the decoder has reached a terminal state (sentinel seen, or
    /// closed with all input resolved).
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Text received but not yet resolved into a frame.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Resolve an unterminated final line left in the buffer.
    fn take_residue(&mut self) -> Option<Frame> {
        let residue = std::mem::take(&mut self.buffer);
        if residue.trim().is_empty() {
            return None;
        }

        let data = residue.strip_prefix(DATA_PREFIX).unwrap_or(&residue);
        match serde_json::from_str::<Value>(data) {
            Ok(value) => Some(Frame::Payload(value)),
            Err(e) => {
                debug!(error = %e, "dropping unparseable stream residue");
                None
            }
        }
    }
}

/// Extension trait for `reqwest::Response` to consume an SSE body as JSON.
///
/// # Example
/// ```ignore
/// use futures::StreamExt;
/// use homework_client::sse::SseResponseExt;
///
/// let response = http.post(url).json(&body).send().await?;
/// let mut events = response.sse_json();
/// while let Some(event) = events.next().await {
///     println!("{:?}", event?);
/// }
/// ```
pub trait SseResponseExt {
    /// Convert the response body into a stream of parsed JSON payloads.
    ///
    /// Ends after `[DONE]` or after the body ends. A transport failure is
    /// yielded once as `Err` and ends the stream.
    fn sse_json(self) -> impl Stream<Item = Result<Value, ClientError>> + Send;
}

impl SseResponseExt for reqwest::Response {
    fn sse_json(self) -> impl Stream<Item = Result<Value, ClientError>> + Send {
        json_frames(self.bytes_stream())
    }
}

/// Decode any byte stream into a stream of JSON payloads.
pub fn json_frames<S, B, E>(byte_stream: S) -> impl Stream<Item = Result<Value, ClientError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send,
    B: AsRef<[u8]> + Send,
    E: Into<ClientError> + Send,
{
    stream::unfold(
        (Box::pin(byte_stream), FrameDecoder::new(), false),
        |(mut byte_stream, mut decoder, failed)| async move {
            if failed {
                return None;
            }

            loop {
                match decoder.next_frame() {
                    Some(Frame::Payload(value)) => {
                        return Some((Ok(value), (byte_stream, decoder, false)));
                    }
                    Some(Frame::Done) => return None,
                    None if decoder.is_done() => return None,
                    None => {}
                }

                match byte_stream.next().await {
                    Some(Ok(chunk)) => decoder.push_bytes(chunk.as_ref()),
                    Some(Err(e)) => {
                        return Some((Err(e.into()), (byte_stream, decoder, true)));
                    }
                    None => decoder.close(),
                }
            }
        },
    )
}

/// Parse an SSE line to extract the data portion.
///
/// The prefix is matched exactly and the remainder is returned untouched.
///
/// # Example
/// ```
/// use homework_client::sse::parse_sse_line;
///
/// let line = "data: {\"key\": \"value\"}";
/// assert_eq!(parse_sse_line(line), Some("{\"key\": \"value\"}"));
///
/// assert_eq!(parse_sse_line(": heartbeat"), None);
/// ```
pub fn parse_sse_line(line: &str) -> Option<&str> {
    line.strip_prefix(DATA_PREFIX)
}

/// Check if an SSE data payload is the end-of-stream sentinel.
///
/// # Example
/// ```
/// use homework_client::sse::is_done_marker;
///
/// assert!(is_done_marker("[DONE]"));
/// assert!(!is_done_marker(""));
/// assert!(!is_done_marker("{\"data\": \"value\"}"));
/// ```
pub fn is_done_marker(data: &str) -> bool {
    data == DONE_MARKER
}
