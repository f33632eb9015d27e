//! Embeddings from a local Ollama server.
//!
//! Ollama has no batch endpoint, so batches are embedded one text at a time.
//! Transient failures are retried with exponential backoff.

use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::provider::EmbeddingProvider;
use crate::error::{IndexError, IndexResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const EMBEDDING_ENDPOINT: &str = "/api/embeddings";

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 100;

#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
    normalize: bool,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaProvider {
    /// Build the HTTP client. The server is not contacted until the first embed.
    pub fn new(config: &EmbeddingConfig, dimensions: usize) -> IndexResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                IndexError::Embedding(format!("Failed to create HTTP client for Ollama: {}", e))
            })?;

        let base_url = config
            .endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            model: config.model.clone(),
            dimensions,
            normalize: config.normalize,
        })
    }

    #[instrument(skip(self, text), fields(text_len = text.len(), model = %self.model))]
    async fn embed_with_retries(&self, text: &str) -> IndexResult<Vec<f32>> {
        let mut attempt = 0;
        loop {
            match self.embed_single(text).await {
                Ok(embedding) => return Ok(embedding),
                // A wrong-sized vector will not fix itself on retry.
                Err(e @ IndexError::DimensionMismatch { .. }) => return Err(e),
                Err(e) => {
                    attempt += 1;
                    if attempt >= MAX_RETRIES {
                        return Err(e);
                    }
                    let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt);
                    warn!(
                        "Embedding failed (attempt {}/{}), retrying in {}ms: {}",
                        attempt, MAX_RETRIES, backoff_ms, e
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
            }
        }
    }

    async fn embed_single(&self, text: &str) -> IndexResult<Vec<f32>> {
        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                IndexError::Embedding(format!("Failed to reach Ollama at {}: {}", self.base_url, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|r| r.error)
                .unwrap_or(body);
            return Err(IndexError::Embedding(format!(
                "Ollama API error ({}): {}",
                status, message
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| IndexError::Embedding(format!("Failed to parse Ollama response: {}", e)))?;

        self.finish(body.embedding)
    }

    fn finish(&self, mut embedding: Vec<f32>) -> IndexResult<Vec<f32>> {
        if embedding.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            });
        }

        if self.normalize {
            let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                embedding.iter_mut().for_each(|v| *v /= norm);
            }
        }
        Ok(embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> IndexResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            if text.trim().is_empty() {
                debug!("Empty text embeds to the zero vector");
                embeddings.push(vec![0.0; self.dimensions]);
                continue;
            }
            embeddings.push(self.embed_with_retries(text).await?);
        }
        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(endpoint: Option<&str>, normalize: bool) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: "ollama".to_string(),
            model: "all-minilm".to_string(),
            endpoint: endpoint.map(str::to_string),
            normalize,
            ..Default::default()
        }
    }

    #[test]
    fn test_endpoint_defaults_and_trims() {
        let provider = OllamaProvider::new(&config(None, true), 3).unwrap();
        assert_eq!(provider.base_url, DEFAULT_OLLAMA_URL);

        let provider = OllamaProvider::new(&config(Some("http://gpu-box:11434/"), true), 3).unwrap();
        assert_eq!(provider.base_url, "http://gpu-box:11434");
    }

    #[test]
    fn test_finish_normalizes() {
        let provider = OllamaProvider::new(&config(None, true), 2).unwrap();
        let v = provider.finish(vec![3.0, 4.0]).unwrap();
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_finish_keeps_raw_when_not_normalizing() {
        let provider = OllamaProvider::new(&config(None, false), 2).unwrap();
        assert_eq!(provider.finish(vec![3.0, 4.0]).unwrap(), vec![3.0, 4.0]);
    }

    #[test]
    fn test_finish_rejects_wrong_dimension() {
        let provider = OllamaProvider::new(&config(None, true), 384).unwrap();
        assert!(matches!(
            provider.finish(vec![1.0; 768]),
            Err(IndexError::DimensionMismatch {
                expected: 384,
                actual: 768
            })
        ));
    }

    #[tokio::test]
    async fn test_empty_texts_skip_the_network() {
        // Unroutable endpoint: any request would fail.
        let provider = OllamaProvider::new(&config(Some("http://127.0.0.1:9"), true), 4).unwrap();
        let texts = vec!["".to_string(), "   ".to_string()];
        let embeddings = provider.embed_batch(&texts).await.unwrap();
        assert_eq!(embeddings, vec![vec![0.0; 4], vec![0.0; 4]]);
    }
}
