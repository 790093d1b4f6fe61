//! Aggregation of streamed chat-completion chunks into a full reply.

use serde_json::Value;

use crate::client::ClientError;
use crate::model::{ChatCompletionChunk, ChatMessage};
use crate::session::StreamSink;

/// Callback receiving `(delta, reply_so_far)` for every text delta.
pub type DeltaCallback = Box<dyn FnMut(&str, &str) + Send>;

/// A [`StreamSink`] that concatenates `choices[0].delta.content`.
///
/// Payloads that are not chat-completion chunks, or carry no text, are
/// ignored.
///
/// # Example
/// ```
/// use homework_client::session::StreamSink;
/// use homework_client::stream::ReplyAccumulator;
/// use serde_json::json;
///
/// let mut reply = ReplyAccumulator::new();
/// reply.on_chunk(json!({"choices": [{"delta": {"content": "Good "}}]}));
/// reply.on_chunk(json!({"choices": [{"delta": {"content": "work"}}]}));
/// reply.on_complete();
/// assert_eq!(reply.reply(), "Good work");
/// ```
#[derive(Default)]
pub struct ReplyAccumulator {
    reply: String,
    on_delta: Option<DeltaCallback>,
    finish_reason: Option<String>,
    completed: bool,
    error: Option<String>,
}

impl ReplyAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward every delta to `on_delta` as it arrives.
    pub fn with_delta_callback(mut self, on_delta: impl FnMut(&str, &str) + Send + 'static) -> Self {
        self.on_delta = Some(Box::new(on_delta));
        self
    }

    /// The text accumulated so far.
    pub fn reply(&self) -> &str {
        &self.reply
    }

    /// Last finish reason reported by the model, if any.
    pub fn finish_reason(&self) -> Option<&str> {
        self.finish_reason.as_deref()
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Display text of the transport error that ended the stream.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn into_reply(self) -> String {
        self.reply
    }

    /// The accumulated reply as an assistant message.
    pub fn into_message(self) -> ChatMessage {
        ChatMessage::assistant(self.reply)
    }
}

impl std::fmt::Debug for ReplyAccumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyAccumulator")
            .field("reply", &self.reply)
            .field("finish_reason", &self.finish_reason)
            .field("completed", &self.completed)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl StreamSink for ReplyAccumulator {
    fn on_chunk(&mut self, payload: Value) {
        let Ok(chunk) = serde_json::from_value::<ChatCompletionChunk>(payload) else {
            return;
        };

        if let Some(reason) = chunk.finish_reason() {
            self.finish_reason = Some(reason.to_string());
        }

        if let Some(delta) = chunk.delta_content() {
            self.reply.push_str(delta);
            if let Some(on_delta) = self.on_delta.as_mut() {
                on_delta(delta, &self.reply);
            }
        }
    }

    fn on_error(&mut self, error: &ClientError) {
        self.error = Some(error.to_string());
    }

    fn on_complete(&mut self) {
        self.completed = true;
    }
}
