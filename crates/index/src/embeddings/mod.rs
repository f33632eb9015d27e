//! Embedding boundary.
//!
//! Turns document and query text into fixed-length vectors. The index treats
//! providers as deterministic; failures surface as `IndexError::Embedding`.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};
