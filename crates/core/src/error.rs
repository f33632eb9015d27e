//! Error types for the marquee application.
//!
//! A single enum covers configuration, I/O, generation, index, dataset and
//! prompt failures. Crates with a richer taxonomy of their own (the index
//! crate in particular) convert into this type at their public boundary.

use thiserror::Error;

/// Unified error type for the marquee application.
///
/// Every fallible function returns `Result<T, AppError>`; nothing panics
/// on bad input.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Text generation provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Vector index, persistence and retrieval errors
    #[error("Index error: {0}")]
    Index(String),

    /// Dataset ingestion errors
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Prompt rendering errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
