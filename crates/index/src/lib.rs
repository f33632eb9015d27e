//! Movie index for marquee.
//!
//! Embeds movie overviews, keeps them searchable through an exact or a
//! clustered similarity index, persists the whole thing to disk and serves
//! retrieval-augmented recommendations on top.
//!
//! The [`IndexManager`] owns the lifecycle:
//! `Uninitialized → Loaded ⇄ Dirty (→ Persisting)`.

pub mod cache;
pub mod config;
pub mod dataset;
pub mod embeddings;
pub mod error;
pub mod manager;
pub mod persistence;
pub mod progress;
pub mod recommender;
pub mod similarity;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use config::{load_config, save_config, FlushPolicy, IndexConfig};
pub use dataset::{load_movies, Dataset, MovieRecord};
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use error::{IndexError, IndexResult};
pub use manager::{IndexManager, Initialized};
pub use progress::{ProgressEvent, ProgressReporter};
pub use recommender::{FilterCriteria, MovieRecommender, RecommenderPrompts};
pub use types::{
    Document, DocumentOutcome, IndexStats, LifecycleState, MetadataValue, OutcomeStatus,
    SearchStrategy, UpdateReport,
};
