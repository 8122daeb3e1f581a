//! Minimal Ollama chat API client.
//!
//! This crate provides a focused client for a locally hosted Ollama
//! server's chat endpoint with:
//! - Non-streaming chat completions
//! - Greedy decoding options (temperature 0, fixed seed) so the same
//!   conversation always yields the same completion
//! - A server reachability probe for startup checks

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "qwen2.5:1.5b-instruct";

/// Seed pinned into every request. With temperature 0 decoding is greedy,
/// so the seed only matters if a model config re-enables sampling.
const DECODE_SEED: u64 = 0;

/// Errors that can occur when using the Ollama client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Ollama API client.
#[derive(Debug, Clone)]
pub struct Ollama {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl Ollama {
    /// Create a new client pointed at the default local server.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a new client for the given base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Create a client from `OLLAMA_BASE_URL` and `OLLAMA_MODEL`,
    /// falling back to defaults for whichever is unset.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("OLLAMA_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let mut client = Self::with_base_url(base_url);
        if let Ok(model) = std::env::var("OLLAMA_MODEL") {
            client.model = model;
        }
        client
    }

    /// Set the default model for this client.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// The model identifier requests default to.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Check that the server is reachable.
    ///
    /// Intended for startup: an unreachable backend should abort the
    /// program before any session state exists.
    pub async fn probe(&self) -> Result<(), Error> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }
        Ok(())
    }

    /// Send a chat request and return the full response.
    pub async fn chat(&self, request: Request) -> Result<ChatResponse, Error> {
        let api_request = self.build_api_request(&request);
        let headers = build_headers();

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .headers(headers)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        Ok(ChatResponse {
            model: api_response.model,
            message: api_response.message,
            done: api_response.done,
            eval_count: api_response.eval_count,
        })
    }

    fn build_api_request(&self, request: &Request) -> ApiRequest {
        ApiRequest {
            model: request.model.clone().unwrap_or_else(|| self.model.clone()),
            messages: request.messages.clone(),
            stream: false,
            options: ApiOptions {
                temperature: 0.0,
                seed: DECODE_SEED,
                num_predict: request.max_tokens.map(|n| n as i64),
            },
        }
    }
}

impl Default for Ollama {
    fn default() -> Self {
        Self::new()
    }
}

fn build_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

// ============================================================================
// Public types
// ============================================================================

/// A chat request to send to the server.
#[derive(Debug, Clone)]
pub struct Request {
    pub model: Option<String>,
    pub messages: Vec<Message>,
    pub max_tokens: Option<usize>,
}

impl Request {
    /// Create a new request with the given messages.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            model: None,
            messages,
            max_tokens: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Wire-format name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A chat response from the server.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub model: String,
    pub message: Message,
    pub done: bool,
    pub eval_count: Option<u64>,
}

impl ChatResponse {
    /// The completion text.
    pub fn text(&self) -> &str {
        &self.message.content
    }
}

// ============================================================================
// Internal API types
// ============================================================================

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
    options: ApiOptions,
}

#[derive(Debug, Serialize)]
struct ApiOptions {
    temperature: f32,
    seed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: String,
    message: Message,
    done: bool,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = Ollama::new();
        assert_eq!(client.model(), DEFAULT_MODEL);
    }

    #[test]
    fn test_client_with_model() {
        let client = Ollama::new().with_model("llama3.2:3b");
        assert_eq!(client.model(), "llama3.2:3b");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = Ollama::with_base_url("http://box:11434/");
        assert_eq!(client.base_url, "http://box:11434");
    }

    #[test]
    fn test_request_builder() {
        let request = Request::new(vec![Message::user("Hello")])
            .with_model("llama3.2:3b")
            .with_max_tokens(128);

        assert_eq!(request.model.as_deref(), Some("llama3.2:3b"));
        assert_eq!(request.max_tokens, Some(128));
        assert_eq!(request.messages.len(), 1);
    }

    #[test]
    fn test_message_creation() {
        let user_msg = Message::user("Hello");
        assert_eq!(user_msg.role, Role::User);
        assert_eq!(user_msg.content, "Hello");

        let assistant_msg = Message::assistant("Hi there");
        assert_eq!(assistant_msg.role, Role::Assistant);

        let system_msg = Message::system("Stay in character.");
        assert_eq!(system_msg.role, Role::System);
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Message::assistant("ok")).expect("serialize");
        assert!(json.contains("\"role\":\"assistant\""));
    }

    #[test]
    fn test_api_request_pins_greedy_decoding() {
        let client = Ollama::new();
        let request = Request::new(vec![Message::user("hi")]).with_max_tokens(64);
        let api_request = client.build_api_request(&request);

        assert!(!api_request.stream);
        assert_eq!(api_request.options.temperature, 0.0);
        assert_eq!(api_request.options.num_predict, Some(64));

        let value = serde_json::to_value(&api_request).expect("serialize");
        assert_eq!(value["options"]["temperature"], 0.0);
        assert_eq!(value["messages"][0]["role"], "user");
    }
}
