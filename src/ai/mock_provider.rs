//! Mock AI provider for testing
//!
//! Chat responses are queued in order; embeddings are registered per input
//! text. Unregistered embeddings return a zero vector, which can never
//! clear the vector-match threshold, so tests opt in to vector behavior
//! explicitly.

use crate::ai::errors::AiProviderError;
use crate::ai::provider::AiProvider;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub struct MockProvider {
    chat_responses: Arc<Mutex<VecDeque<Value>>>,
    embed_responses: Arc<Mutex<HashMap<String, Vec<f64>>>>,
    embedding_dimension: usize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            chat_responses: Arc::new(Mutex::new(VecDeque::new())),
            embed_responses: Arc::new(Mutex::new(HashMap::new())),
            embedding_dimension: 8,
        }
    }

    /// Queue the next chat_json reply.
    pub fn push_chat_response(&self, response: Value) {
        self.chat_responses.lock().unwrap().push_back(response);
    }

    /// Register an embedding for an exact input text.
    pub fn register_embedding(&self, text: &str, embedding: Vec<f64>) {
        self.embed_responses.lock().unwrap().insert(text.to_string(), embedding);
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AiProvider for MockProvider {
    async fn chat_json(&self, _prompt: &str) -> Result<Value, AiProviderError> {
        self.chat_responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| {
                AiProviderError::InvalidResponse("no mock chat response registered".to_string())
            })
    }

    async fn embed(&self, text: &str) -> Result<Vec<f64>, AiProviderError> {
        Ok(self
            .embed_responses
            .lock()
            .unwrap()
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![0.0; self.embedding_dimension]))
    }
}
