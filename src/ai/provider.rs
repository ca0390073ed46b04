use crate::ai::errors::AiProviderError;
use serde_json::Value;

/// LLM boundary for the two pipelines: structured-JSON extraction and text
/// embeddings. The ranking core never touches this directly; only the
/// extractors and the embedding cache do.
#[async_trait::async_trait]
pub trait AiProvider: Send + Sync {
    /// Send a prompt and get back parsed JSON. The model is used strictly
    /// as a structured extractor; it never participates in ranking.
    async fn chat_json(&self, prompt: &str) -> Result<Value, AiProviderError>;

    /// Generate an embedding vector for the given text.
    async fn embed(&self, text: &str) -> Result<Vec<f64>, AiProviderError>;
}
