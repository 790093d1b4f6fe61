//! # homework-client
//!
//! Client side of a homework submission and AI correction service.
//!
//! ## Features
//! - Async-first, tokio compatible
//! - Incremental decoding of `data: ` framed streaming responses, safe across
//!   arbitrary chunk boundaries (including split UTF-8 characters)
//! - Callback sinks with at-most-once completion/error and cancellation
//! - Typed access to the service's `/api/*` endpoints and to an
//!   OpenAI-compatible streaming chat model
//! - Conversation transcripts persisted as JSON
//!
//! ## Architecture
//!
//! - **`sse::FrameDecoder`**: I/O-free buffer that turns bytes into frames
//! - **`session::decode_stream`**: drives a byte stream into a `StreamSink`
//! - **`stream::ReplyAccumulator`**: sink that assembles the assistant reply
//! - **`client::HomeworkClient`**: HTTP endpoints built on the above
//!
//! ## Example
//! ```no_run
//! use homework_client::client::HomeworkClient;
//! use homework_client::model::{ChatMessage, Transcript};
//! use homework_client::options::{ChatModelOptions, ClientOptions};
//! use homework_client::stream::ReplyAccumulator;
//! use homework_client::transcript::TranscriptStore;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HomeworkClient::new(ClientOptions::new("http://localhost:5000"))?
//!         .with_chat_model(ChatModelOptions::new("your-api-key"));
//!
//!     let store = TranscriptStore::new("chat_history.json");
//!     let mut transcript = match store.load().await? {
//!         Some(saved) => saved,
//!         None => Transcript::with_greeting(
//!             "You are a homework grading assistant.",
//!             "Hi! Send me your homework and I will review it.",
//!         ),
//!     };
//!     transcript.push(ChatMessage::user("Please check: 2 + 2 = 5"));
//!
//!     let mut reply = ReplyAccumulator::new().with_delta_callback(|delta, _| print!("{delta}"));
//!     client
//!         .chat_completion_stream(&transcript.messages, &mut reply, &CancellationToken::new())
//!         .await?;
//!
//!     transcript.push(reply.into_message());
//!     store.save(&transcript).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod http;
pub mod model;
pub mod options;
pub mod session;
pub mod sse;
pub mod stream;
pub mod transcript;
pub mod utf8;

// Re-exports for convenience
pub use client::{ClientError, Endpoint, HomeworkClient};
pub use model::{ChatMessage, Role, Transcript};
pub use session::{decode_stream, SessionEnd, StreamSink};
pub use sse::{Frame, FrameDecoder, SseResponseExt};
pub use stream::ReplyAccumulator;
