//! Lifecycle and end-to-end scenario tests for the index manager.

mod lifecycle;

use crate::config::IndexConfig;
use crate::embeddings::providers::TrigramProvider;
use crate::embeddings::EmbeddingProvider;
use crate::error::{IndexError, IndexResult};
use crate::manager::IndexManager;
use crate::types::Document;
use std::path::Path;
use std::sync::Arc;

pub(crate) const DIM: usize = 64;

const WORDS: &[&str] = &[
    "heist", "robots", "romance", "dragons", "detective", "pirates", "zombies", "courtroom",
    "spaceship", "boxing", "vampires", "orchestra", "submarine", "cowboys", "samurai", "volcano",
];

pub(crate) fn test_config(dir: &Path) -> IndexConfig {
    IndexConfig {
        dimension: DIM,
        nlist: 4,
        nprobe: 2,
        ..IndexConfig::with_store_dir(dir.join("store"))
    }
}

pub(crate) fn manager_with(config: IndexConfig) -> IndexManager {
    let dimension = config.dimension;
    IndexManager::with_provider(config, Arc::new(TrigramProvider::new(dimension))).unwrap()
}

pub(crate) fn manager(dir: &Path) -> IndexManager {
    manager_with(test_config(dir))
}

pub(crate) fn doc(id: &str, text: &str) -> Document {
    Document::new(id, text).with_metadata("title", format!("Movie {}", id))
}

/// `n` documents with ids `prefix0..prefixN` and varied plots.
pub(crate) fn corpus(prefix: &str, n: usize) -> Vec<Document> {
    (0..n)
        .map(|i| {
            let text = format!(
                "{} story with {} and {} number{}",
                WORDS[i % WORDS.len()],
                WORDS[(i * 7 + 3) % WORDS.len()],
                WORDS[(i * 5 + 1) % WORDS.len()],
                i
            );
            doc(&format!("{}{}", prefix, i), &text)
        })
        .collect()
}

pub(crate) async fn embed(text: &str) -> Vec<f32> {
    TrigramProvider::new(DIM).embed(text).await.unwrap()
}

pub(crate) async fn probe_queries() -> Vec<Vec<f32>> {
    let mut queries = Vec::new();
    for text in ["robots", "heist crew", "a samurai on a submarine", "love story", "xyz"] {
        queries.push(embed(text).await);
    }
    queries
}

/// Fails whole batches containing `FAIL`; single-text calls fail only for that text.
#[derive(Debug)]
pub(crate) struct FlakyProvider {
    inner: TrigramProvider,
}

impl FlakyProvider {
    pub(crate) fn new() -> Self {
        Self {
            inner: TrigramProvider::new(DIM),
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for FlakyProvider {
    fn provider_name(&self) -> &str {
        "flaky"
    }

    fn model_name(&self) -> &str {
        "flaky-v1"
    }

    fn dimensions(&self) -> usize {
        DIM
    }

    async fn embed_batch(&self, texts: &[String]) -> IndexResult<Vec<Vec<f32>>> {
        if texts.iter().any(|t| t.contains("FAIL")) {
            return Err(IndexError::Embedding("provider unavailable".to_string()));
        }
        self.inner.embed_batch(texts).await
    }
}

/// Claims `DIM` dimensions but returns shorter vectors for texts containing `SHORT`.
#[derive(Debug)]
pub(crate) struct ShortVectorProvider {
    inner: TrigramProvider,
}

impl ShortVectorProvider {
    pub(crate) fn new() -> Self {
        Self {
            inner: TrigramProvider::new(DIM),
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for ShortVectorProvider {
    fn provider_name(&self) -> &str {
        "short"
    }

    fn model_name(&self) -> &str {
        "short-v1"
    }

    fn dimensions(&self) -> usize {
        DIM
    }

    async fn embed_batch(&self, texts: &[String]) -> IndexResult<Vec<Vec<f32>>> {
        let mut vectors = self.inner.embed_batch(texts).await?;
        for (text, vector) in texts.iter().zip(vectors.iter_mut()) {
            if text.contains("SHORT") {
                vector.truncate(DIM / 2);
            }
        }
        Ok(vectors)
    }
}
