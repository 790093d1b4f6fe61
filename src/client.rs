//! HTTP client for the homework service and its streaming chat model.

use bytes::Bytes;
use futures::{stream, StreamExt};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::http::{add_extra_headers, build_http_client};
use crate::model::{ChatCompletionRequest, ChatMessage};
use crate::options::{ChatModelOptions, ClientOptions};
use crate::session::{decode_stream, SessionEnd, StreamSink};

/// Size of the body slices reported to an upload progress callback.
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Errors that can occur during client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Service endpoints, relative to the configured base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Upload,
    Correct,
    Chat,
    History,
    Stats,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Upload => "/api/upload_homework",
            Endpoint::Correct => "/api/correct",
            Endpoint::Chat => "/api/chat",
            Endpoint::History => "/api/history",
            Endpoint::Stats => "/api/stats",
        }
    }
}

/// Upload progress callback, called with whole percentages.
pub type UploadProgress = Box<dyn FnMut(u8) + Send + 'static>;

/// Client for the homework submission and correction service.
///
/// # Example
/// ```no_run
/// use homework_client::client::HomeworkClient;
/// use homework_client::options::ClientOptions;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = HomeworkClient::new(ClientOptions::new("http://localhost:5000"))?;
///     let stats = client.get_stats().await?;
///     println!("{stats}");
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct HomeworkClient {
    http: reqwest::Client,
    options: ClientOptions,
    chat_model: Option<ChatModelOptions>,
}

impl HomeworkClient {
    /// Create a client for the service at `options.base_url`.
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let http = build_http_client(&options)?;
        Ok(Self {
            http,
            options,
            chat_model: None,
        })
    }

    /// Attach the chat model used by [`chat_completion_stream`](Self::chat_completion_stream).
    pub fn with_chat_model(mut self, chat_model: ChatModelOptions) -> Self {
        self.chat_model = Some(chat_model);
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Full URL of an endpoint.
    pub fn url(&self, endpoint: Endpoint) -> String {
        format!(
            "{}{}",
            self.options.base_url.trim_end_matches('/'),
            endpoint.path()
        )
    }

    /// Upload a homework file as the `file` field of a multipart form.
    ///
    /// `progress` receives the share of the file handed to the transport, as a
    /// rounded percentage. The last reported value is always 100.
    pub async fn upload_homework(
        &self,
        file_name: impl Into<String>,
        contents: impl Into<Bytes>,
        progress: Option<UploadProgress>,
    ) -> Result<Value, ClientError> {
        let contents: Bytes = contents.into();
        let total = contents.len();
        let part = Part::stream_with_length(progress_body(contents, progress), total as u64)
            .file_name(file_name.into());
        let form = Form::new().part("file", part);

        let req = add_extra_headers(
            self.http.post(self.url(Endpoint::Upload)),
            &self.options.extra_headers,
        );
        let response = check_response(req.multipart(form).send().await?).await?;
        Ok(response.json().await?)
    }

    /// Request the AI correction of an uploaded homework.
    pub async fn get_correction(&self, homework_id: impl Serialize) -> Result<Value, ClientError> {
        let homework_id = serde_json::to_value(homework_id)?;
        self.post_json(Endpoint::Correct, &json!({ "homework_id": homework_id }))
            .await
    }

    /// Send a single, non-streamed chat message.
    pub async fn send_chat_message(&self, message: &str) -> Result<Value, ClientError> {
        self.post_json(Endpoint::Chat, &json!({ "message": message }))
            .await
    }

    /// Fetch one page of the submission history.
    pub async fn get_history(&self, page: u32, per_page: u32) -> Result<Value, ClientError> {
        let req = self
            .http
            .get(self.url(Endpoint::History))
            .query(&[("page", page), ("per_page", per_page)]);
        let req = add_extra_headers(req, &self.options.extra_headers);
        let response = check_response(req.send().await?).await?;
        Ok(response.json().await?)
    }

    /// Fetch the user's statistics.
    pub async fn get_stats(&self) -> Result<Value, ClientError> {
        let req = add_extra_headers(
            self.http.get(self.url(Endpoint::Stats)),
            &self.options.extra_headers,
        );
        let response = check_response(req.send().await?).await?;
        Ok(response.json().await?)
    }

    /// POST `body` to `endpoint` and decode the streamed response into `sink`.
    ///
    /// Failures before the body starts (connection errors, non-success status)
    /// are reported through [`StreamSink::on_error`] like transport failures.
    pub async fn send_stream_request<K>(
        &self,
        endpoint: Endpoint,
        body: &impl Serialize,
        sink: &mut K,
        cancel: &CancellationToken,
    ) -> Result<SessionEnd, ClientError>
    where
        K: StreamSink + ?Sized,
    {
        let req = add_extra_headers(
            self.http
                .post(self.url(endpoint))
                .header(CONTENT_TYPE, "application/json")
                .json(body),
            &self.options.extra_headers,
        );

        stream_into(req, sink, cancel).await
    }

    /// Stream a chat completion for `messages` from the configured chat model.
    pub async fn chat_completion_stream<K>(
        &self,
        messages: &[ChatMessage],
        sink: &mut K,
        cancel: &CancellationToken,
    ) -> Result<SessionEnd, ClientError>
    where
        K: StreamSink + ?Sized,
    {
        let model = self
            .chat_model
            .as_ref()
            .ok_or_else(|| ClientError::Config("chat model is not configured".to_string()))?;

        let request_body = ChatCompletionRequest {
            model: &model.model,
            messages,
            stream: true,
            temperature: model.temperature,
            max_tokens: model.max_tokens,
        };

        debug!(model = %model.model, messages = messages.len(), "starting chat completion stream");

        let req = self
            .http
            .post(&model.api_url)
            .header(AUTHORIZATION, format!("Bearer {}", model.api_key.expose_secret()))
            .header(CONTENT_TYPE, "application/json")
            .json(&request_body);

        stream_into(req, sink, cancel).await
    }

    async fn post_json(&self, endpoint: Endpoint, body: &Value) -> Result<Value, ClientError> {
        let req = add_extra_headers(
            self.http
                .post(self.url(endpoint))
                .header(CONTENT_TYPE, "application/json")
                .json(body),
            &self.options.extra_headers,
        );
        let response = check_response(req.send().await?).await?;
        Ok(response.json().await?)
    }
}

/// Send `req` and run a decode session over its body.
async fn stream_into<K>(
    req: reqwest::RequestBuilder,
    sink: &mut K,
    cancel: &CancellationToken,
) -> Result<SessionEnd, ClientError>
where
    K: StreamSink + ?Sized,
{
    let sent = match req.send().await {
        Ok(response) => check_response(response).await,
        Err(e) => Err(ClientError::from(e)),
    };

    let response = match sent {
        Ok(response) => response,
        Err(error) => {
            sink.on_error(&error);
            return Err(error);
        }
    };

    decode_stream(response.bytes_stream(), sink, cancel).await
}

/// Turn a non-success response into [`ClientError::Api`].
async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(api_error(status, &body))
}

/// Build an API error from a failed response body.
///
/// Uses the body's `message` (or OpenAI-style `error.message`) when present.
fn api_error(status: StatusCode, body: &str) -> ClientError {
    let message = match serde_json::from_str::<Value>(body) {
        Ok(value) => value
            .get("message")
            .or_else(|| value.pointer("/error/message"))
            .and_then(Value::as_str)
            .filter(|message| !message.is_empty())
            .unwrap_or("request failed")
            .to_string(),
        Err(_) => "server error".to_string(),
    };

    ClientError::Api {
        status: status.as_u16(),
        message,
    }
}

/// Wrap `contents` in a streaming body that reports progress as it is read.
fn progress_body(contents: Bytes, progress: Option<UploadProgress>) -> Body {
    let total = contents.len();
    let mut progress = progress;

    if total == 0 {
        if let Some(report) = progress.as_mut() {
            report(100);
        }
        return Body::from(contents);
    }

    let slices: Vec<Bytes> = (0..total)
        .step_by(UPLOAD_CHUNK_SIZE)
        .map(|start| contents.slice(start..total.min(start + UPLOAD_CHUNK_SIZE)))
        .collect();

    let mut sent = 0usize;
    let chunks = stream::iter(slices).map(move |slice| {
        sent += slice.len();
        if let Some(report) = progress.as_mut() {
            report(percent(sent, total));
        }
        Ok::<Bytes, std::io::Error>(slice)
    });

    Body::wrap_stream(chunks)
}

fn percent(sent: usize, total: usize) -> u8 {
    ((sent as f64 * 100.0) / total as f64).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_urls() {
        let client = HomeworkClient::new(ClientOptions::new("http://localhost:5000/")).unwrap();
        assert_eq!(client.url(Endpoint::Upload), "http://localhost:5000/api/upload_homework");
        assert_eq!(client.url(Endpoint::Correct), "http://localhost:5000/api/correct");
        assert_eq!(client.url(Endpoint::Chat), "http://localhost:5000/api/chat");
        assert_eq!(client.url(Endpoint::History), "http://localhost:5000/api/history");
        assert_eq!(client.url(Endpoint::Stats), "http://localhost:5000/api/stats");
    }

    #[test]
    fn test_api_error_message_sources() {
        let from_message = api_error(StatusCode::BAD_REQUEST, r#"{"message":"unsupported file type"}"#);
        assert!(matches!(
            from_message,
            ClientError::Api { status: 400, ref message } if message == "unsupported file type"
        ));

        let from_openai = api_error(
            StatusCode::UNAUTHORIZED,
            r#"{"error":{"message":"invalid api key","type":"auth"}}"#,
        );
        assert!(matches!(from_openai, ClientError::Api { ref message, .. } if message == "invalid api key"));

        let no_message = api_error(StatusCode::INTERNAL_SERVER_ERROR, r#"{"success":false}"#);
        assert!(matches!(no_message, ClientError::Api { ref message, .. } if message == "request failed"));

        let not_json = api_error(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert!(matches!(not_json, ClientError::Api { status: 502, ref message } if message == "server error"));
    }

    #[test]
    fn test_percent_rounds() {
        assert_eq!(percent(0, 3), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(3, 3), 100);
    }

    #[tokio::test]
    async fn test_chat_stream_requires_model() {
        struct Ignore;
        impl StreamSink for Ignore {
            fn on_chunk(&mut self, _payload: Value) {}
        }

        let client = HomeworkClient::new(ClientOptions::new("http://localhost")).unwrap();
        let result = client
            .chat_completion_stream(&[ChatMessage::user("hi")], &mut Ignore, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(ClientError::Config(_))));
    }
}
