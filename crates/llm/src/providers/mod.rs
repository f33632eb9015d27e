//! Concrete text generation providers.

pub mod azure;
pub mod ollama;

pub use azure::AzureOpenAiClient;
pub use ollama::OllamaClient;
