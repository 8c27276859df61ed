use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{ChatMessage, LanguageModel, LlmConfig, LlmError, LlmResponse, LlmResult};

/// Client for an OpenAI-compatible chat-completions endpoint.
///
/// Works against the hosted API and against local servers that speak the
/// same protocol; only the endpoint and key differ.
pub struct ChatCompletionsClient {
    config: LlmConfig,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<ChatCompletionsChoice>,
    usage: Option<ChatCompletionsUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsUsage {
    total_tokens: u32,
}

impl ChatCompletionsClient {
    /// Build a client from config, resolving credentials immediately.
    pub fn new(config: LlmConfig) -> LlmResult<Self> {
        let api_key = config.resolve_api_key()?;
        Self::with_api_key(config, api_key)
    }

    /// Build a client with an explicitly supplied key.
    pub fn with_api_key(config: LlmConfig, api_key: String) -> LlmResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }
}

#[async_trait]
impl LanguageModel for ChatCompletionsClient {
    async fn chat(&self, messages: Vec<ChatMessage>) -> LlmResult<LlmResponse> {
        let request = ChatCompletionsRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: self.config.max_response_tokens,
            temperature: self.config.temperature,
        };

        debug!("Sending correction request to {}", self.config.endpoint);

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(LlmError::RateLimited(message));
            }
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletionsResponse = response.json().await?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse)?
            .message
            .content;

        let tokens_used = completion.usage.map(|u| u.total_tokens);

        Ok(LlmResponse {
            content,
            tokens_used,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_api_key() {
        let config = LlmConfig {
            api_key_env: "CLIPSCRIBE_TEST_KEY_THAT_IS_NOT_SET".to_string(),
            ..LlmConfig::default()
        };
        match ChatCompletionsClient::new(config) {
            Err(LlmError::MissingApiKey(var)) => {
                assert_eq!(var, "CLIPSCRIBE_TEST_KEY_THAT_IS_NOT_SET");
            }
            other => panic!("expected MissingApiKey, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_client_builds_with_explicit_key() {
        let client =
            ChatCompletionsClient::with_api_key(LlmConfig::default(), "sk-test".to_string());
        assert!(client.is_ok());
    }
}
