//! Callback-driven decode sessions.
//!
//! A session pulls byte chunks from one response body, feeds them through a
//! [`FrameDecoder`] and reports the results to a [`StreamSink`]. It ends exactly
//! once: on the `[DONE]` sentinel, at the natural end of the body, on a
//! transport error, or when its cancellation token fires.

use futures::{Stream, StreamExt};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::ClientError;
use crate::sse::{Frame, FrameDecoder};

/// Receiver of decoded stream events.
///
/// `on_chunk` is called once per parsed payload in stream order. Exactly one
/// of `on_complete` or `on_error` follows, unless the session is cancelled, in
/// which case neither is called.
pub trait StreamSink {
    /// A payload frame was decoded.
    fn on_chunk(&mut self, payload: Value);

    /// Reading the stream failed. The session ends after this call.
    fn on_error(&mut self, _error: &ClientError) {}

    /// The stream finished normally.
    fn on_complete(&mut self) {}
}

/// How a session ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The `[DONE]` sentinel was received.
    Sentinel,
    /// The body ended without a sentinel.
    Exhausted,
    /// The cancellation token fired before the stream finished.
    Cancelled,
}

/// Run one decode session over `byte_stream`.
///
/// The stream is owned by the session and dropped on every exit path, so the
/// underlying connection is released as soon as this future resolves. A read
/// error is passed to [`StreamSink::on_error`] and then returned.
///
/// # Example
/// ```
/// use futures::stream;
/// use homework_client::session::{decode_stream, SessionEnd, StreamSink};
/// use serde_json::Value;
/// use tokio_util::sync::CancellationToken;
///
/// #[derive(Default)]
/// struct Collect(Vec<Value>);
///
/// impl StreamSink for Collect {
///     fn on_chunk(&mut self, payload: Value) {
///         self.0.push(payload);
///     }
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let body = stream::iter(vec![Ok::<_, std::io::Error>(&b"data: {\"a\":1}\ndata: [DONE]\n"[..])]);
///     let mut sink = Collect::default();
///     let end = decode_stream(body, &mut sink, &CancellationToken::new()).await.unwrap();
///     assert_eq!(end, SessionEnd::Sentinel);
///     assert_eq!(sink.0.len(), 1);
/// }
/// ```
pub async fn decode_stream<S, B, E, K>(
    byte_stream: S,
    sink: &mut K,
    cancel: &CancellationToken,
) -> Result<SessionEnd, ClientError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<ClientError>,
    K: StreamSink + ?Sized,
{
    let mut byte_stream = std::pin::pin!(byte_stream);
    let mut decoder = FrameDecoder::new();
    let mut chunks = 0usize;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(chunks, "stream session cancelled");
                return Ok(SessionEnd::Cancelled);
            }
            next = byte_stream.next() => next,
        };

        match next {
            Some(Ok(bytes)) => decoder.push_bytes(bytes.as_ref()),
            Some(Err(e)) => {
                let error = e.into();
                debug!(chunks, error = %error, "stream session failed");
                sink.on_error(&error);
                return Err(error);
            }
            None => decoder.close(),
        }

        while let Some(frame) = decoder.next_frame() {
            match frame {
                Frame::Payload(payload) => {
                    chunks += 1;
                    sink.on_chunk(payload);
                }
                Frame::Done => {
                    debug!(chunks, "stream session reached sentinel");
                    sink.on_complete();
                    return Ok(SessionEnd::Sentinel);
                }
            }
        }

        if decoder.is_done() {
            debug!(chunks, "stream session exhausted");
            sink.on_complete();
            return Ok(SessionEnd::Exhausted);
        }
    }
}
