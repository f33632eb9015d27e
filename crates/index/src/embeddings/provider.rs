//! Embedding provider trait and factory.

use super::providers::{OllamaProvider, TrigramProvider};
use crate::embeddings::config::EmbeddingConfig;
use crate::error::{IndexError, IndexResult};
use std::sync::Arc;

#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Provider name (e.g., "trigram", "ollama")
    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;

    fn dimensions(&self) -> usize;

    /// Embed several texts; output order matches input order.
    async fn embed_batch(&self, texts: &[String]) -> IndexResult<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> IndexResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| IndexError::Embedding("No embedding returned".to_string()))
    }
}

/// Create an embedding provider producing `dimension`-length vectors.
pub fn create_provider(
    config: &EmbeddingConfig,
    dimension: usize,
) -> IndexResult<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "trigram" => Ok(Arc::new(TrigramProvider::new(dimension))),

        "ollama" => Ok(Arc::new(OllamaProvider::new(config, dimension)?)),

        _ => Err(IndexError::Configuration(format!(
            "Unknown embedding provider: '{}'. Supported providers: trigram, ollama",
            config.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_trigram_provider() {
        let provider = create_provider(&EmbeddingConfig::default(), 384).unwrap();
        assert_eq!(provider.provider_name(), "trigram");
        assert_eq!(provider.model_name(), "trigram-v1");
        assert_eq!(provider.dimensions(), 384);
    }

    #[test]
    fn test_create_ollama_provider() {
        let config = EmbeddingConfig {
            provider: "ollama".to_string(),
            model: "all-minilm".to_string(),
            ..Default::default()
        };
        let provider = create_provider(&config, 384).unwrap();
        assert_eq!(provider.provider_name(), "ollama");
        assert_eq!(provider.model_name(), "all-minilm");
    }

    #[test]
    fn test_create_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "unknown".to_string(),
            ..Default::default()
        };

        let result = create_provider(&config, 384);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unknown embedding provider"));
    }

    #[tokio::test]
    async fn test_provider_embed_single() {
        let provider = create_provider(&EmbeddingConfig::default(), 384).unwrap();
        let embedding = provider.embed("space opera").await.unwrap();
        assert_eq!(embedding.len(), 384);
    }
}
