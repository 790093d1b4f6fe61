//! Client and chat-model configuration.

use std::collections::HashMap;
use std::time::Duration;

/// Default OpenAI-compatible chat completions endpoint.
pub const DEFAULT_CHAT_API_URL: &str = "https://api.siliconflow.cn/v1/chat/completions";

/// Default chat model.
pub const DEFAULT_CHAT_MODEL: &str = "Pro/deepseek-ai/DeepSeek-V3";

/// A secret string type for sensitive data like API keys.
/// Prevents accidental logging or display of secrets.
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    /// Create a new secret string.
    pub fn new(s: String) -> Self {
        Self(s)
    }

    /// Get the underlying secret value.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s.to_string())
    }
}

/// Connection settings for the homework web service.
///
/// # Example
/// ```rust
/// use homework_client::options::ClientOptions;
/// use std::time::Duration;
///
/// let options = ClientOptions::new("http://localhost:5000")
///     .with_timeout(Duration::from_secs(30))
///     .with_header("X-Client".to_string(), "cli".to_string());
/// assert_eq!(options.base_url, "http://localhost:5000");
/// ```
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Origin the `/api/*` paths are resolved against
    pub base_url: String,

    /// Request timeout, covering the whole response body
    pub timeout: Option<Duration>,

    /// HTTP proxy URL
    pub proxy: Option<String>,

    /// Additional HTTP headers to include in requests
    pub extra_headers: Option<HashMap<String, String>>,
}

impl ClientOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: None,
            proxy: None,
            extra_headers: None,
        }
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the proxy URL.
    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Set extra headers.
    pub fn with_extra_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.extra_headers = Some(headers);
        self
    }

    /// Add a single extra header.
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key, value);
        self
    }
}

/// Settings for the streaming chat model used by the grading assistant.
#[derive(Debug, Clone)]
pub struct ChatModelOptions {
    /// Model identifier sent in the request body
    pub model: String,

    /// Full URL of the chat completions endpoint
    pub api_url: String,

    /// Bearer token for the completions endpoint
    pub api_key: SecretString,

    /// Temperature for sampling (0.0 - 2.0)
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
}

impl ChatModelOptions {
    /// Create options for the default model and endpoint.
    pub fn new(api_key: impl Into<SecretString>) -> Self {
        Self {
            model: DEFAULT_CHAT_MODEL.to_string(),
            api_url: DEFAULT_CHAT_API_URL.to_string(),
            api_key: api_key.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the model identifier.
    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// Set the completions endpoint URL.
    pub fn with_api_url(mut self, api_url: String) -> Self {
        self.api_url = api_url;
        self
    }

    /// Set the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set maximum tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}
