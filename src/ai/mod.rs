pub mod errors;
pub mod extractor;
pub mod ollama;
pub mod provider;
pub mod retry;

// Mock provider for testing - always available for integration tests
pub mod mock_provider;
