//! Ollama-backed AI provider
//!
//! Talks to a local (or remote) Ollama server over HTTP. Chat calls ask for
//! JSON-formatted output; embedding calls use the configured embedding
//! model. Both are wrapped in the shared retry policy.

use crate::ai::errors::AiProviderError;
use crate::ai::provider::AiProvider;
use crate::ai::retry::{retry_with_backoff, RetryConfig};
use serde::Deserialize;
use serde_json::{json, Value};

pub struct OllamaProvider {
    client: reqwest::Client,
    host: String,
    chat_model: String,
    embed_model: String,
    retry_config: RetryConfig,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f64>,
}

impl OllamaProvider {
    pub fn new(host: &str, chat_model: &str, embed_model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            host: host.trim_end_matches('/').to_string(),
            chat_model: chat_model.to_string(),
            embed_model: embed_model.to_string(),
            retry_config: RetryConfig::default(),
        }
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    async fn chat_once(&self, prompt: &str) -> Result<Value, AiProviderError> {
        let body = json!({
            "model": self.chat_model,
            "messages": [{"role": "user", "content": prompt}],
            "stream": false,
            "format": "json",
        });

        let response = self
            .client
            .post(format!("{}/api/chat", self.host))
            .json(&body)
            .send()
            .await
            .map_err(|e| AiProviderError::NetworkError(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AiProviderError::ModelNotFound(self.chat_model.clone()));
        }
        if !response.status().is_success() {
            return Err(AiProviderError::NetworkError(format!(
                "Ollama chat returned {}",
                response.status()
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AiProviderError::InvalidResponse(e.to_string()))?;

        parse_json_content(&chat.message.content)
    }

    async fn embed_once(&self, text: &str) -> Result<Vec<f64>, AiProviderError> {
        let body = json!({
            "model": self.embed_model,
            "prompt": text,
        });

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.host))
            .json(&body)
            .send()
            .await
            .map_err(|e| AiProviderError::NetworkError(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AiProviderError::ModelNotFound(self.embed_model.clone()));
        }
        if !response.status().is_success() {
            return Err(AiProviderError::NetworkError(format!(
                "Ollama embeddings returned {}",
                response.status()
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AiProviderError::InvalidResponse(e.to_string()))?;

        if parsed.embedding.is_empty() {
            return Err(AiProviderError::InvalidResponse("empty embedding".to_string()));
        }
        Ok(parsed.embedding)
    }
}

/// Parse the model's reply as JSON, stripping a markdown code fence if the
/// model wrapped its output in one despite instructions.
fn parse_json_content(content: &str) -> Result<Value, AiProviderError> {
    let trimmed = content.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    let without_fence = trimmed
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    serde_json::from_str(without_fence).map_err(|e| {
        AiProviderError::InvalidResponse(format!("model output is not valid JSON: {}", e))
    })
}

#[async_trait::async_trait]
impl AiProvider for OllamaProvider {
    async fn chat_json(&self, prompt: &str) -> Result<Value, AiProviderError> {
        retry_with_backoff(|| self.chat_once(prompt), self.retry_config.clone()).await
    }

    async fn embed(&self, text: &str) -> Result<Vec<f64>, AiProviderError> {
        retry_with_backoff(|| self.embed_once(text), self.retry_config.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_content_plain() {
        let value = parse_json_content(r#"{"full_name": "Jane Doe"}"#).unwrap();
        assert_eq!(value["full_name"], "Jane Doe");
    }

    #[test]
    fn test_parse_json_content_fenced() {
        let value = parse_json_content("```json\n{\"a\": 1}\n```").unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_parse_json_content_garbage() {
        assert!(parse_json_content("definitely not json").is_err());
    }
}
