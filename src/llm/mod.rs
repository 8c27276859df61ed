pub mod chunker;
pub mod client;
pub mod correction;
pub mod tokenizer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Errors surfaced by the text-correction service.
///
/// `RateLimited` is kept separate from every other failure because the
/// correction driver treats the two classes differently: exhausted retries
/// after rate limiting degrade a single chunk, while exhausted retries
/// after any other failure abort the whole run.
#[derive(thiserror::Error, Debug)]
pub enum LlmError {
    #[error("rate limited by the correction service: {0}")]
    RateLimited(String),

    #[error("correction service error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("correction service returned no choices")]
    EmptyResponse,

    #[error("API key not found in environment variable {0}")]
    MissingApiKey(String),
}

pub type LlmResult<T> = Result<T, LlmError>;

/// Chat message for the correction service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Response from the correction service.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub tokens_used: Option<u32>,
}

/// Language-model client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Chat-completions endpoint. Defaults to the hosted OpenAI API; point
    /// it at a local server (LM Studio, llama.cpp) for offline use.
    pub endpoint: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Upper bound on response length.
    pub max_response_tokens: u32,
    /// Sampling temperature; corrections should stay close to the input.
    pub temperature: f32,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: "gpt-4o".to_string(),
            max_response_tokens: 16000,
            temperature: 0.2,
            timeout_seconds: 120,
        }
    }
}

impl LlmConfig {
    /// Resolve the API key from the configured environment variable.
    ///
    /// Credentials are a hard precondition for the correction stage, so a
    /// missing key is a startup failure, not a per-call one.
    pub fn resolve_api_key(&self) -> LlmResult<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| LlmError::MissingApiKey(self.api_key_env.clone()))
    }
}

/// Trait for the text-transformation service.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn chat(&self, messages: Vec<ChatMessage>) -> LlmResult<LlmResponse>;
}

pub use chunker::Chunker;
pub use client::ChatCompletionsClient;
pub use correction::{
    ChunkOutcome, CorrectedTranscript, CorrectionConfig, TranscriptCorrector,
};
