//! The generation seam.
//!
//! The turn protocol only needs one operation from a backend: turn an
//! ordered message sequence into completion text. Everything else about
//! inference (model loading, decoding, device placement) stays behind
//! this trait.

use async_trait::async_trait;
use ollama::Message;
use thiserror::Error;

/// Errors from a generation backend.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Ollama API error: {0}")]
    Api(#[from] ollama::Error),

    #[error("backend error: {0}")]
    Backend(String),
}

/// A deterministic text-generation backend.
///
/// Implementations must be greedy (no sampling) so that replaying the
/// same conversation reproduces the same output.
#[async_trait]
pub trait TextGenerator: Send {
    /// Generate completion text for the given conversation.
    async fn generate(&mut self, messages: &[Message]) -> Result<String, GenerateError>;

    /// Identifier of the underlying model, for turn records.
    fn model_id(&self) -> &str;
}

/// Production backend: an Ollama chat endpoint.
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: ollama::Ollama,
    max_tokens: usize,
}

impl OllamaGenerator {
    pub fn new(client: ollama::Ollama, max_tokens: usize) -> Self {
        Self { client, max_tokens }
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn generate(&mut self, messages: &[Message]) -> Result<String, GenerateError> {
        let request =
            ollama::Request::new(messages.to_vec()).with_max_tokens(self.max_tokens);
        let response = self.client.chat(request).await?;
        Ok(response.text().trim().to_string())
    }

    fn model_id(&self) -> &str {
        self.client.model()
    }
}
