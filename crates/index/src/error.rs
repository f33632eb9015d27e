//! Error taxonomy for the index lifecycle.

use marquee_core::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    /// Required inputs for initialization are missing or invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Durable storage could not be read or written.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The embedding boundary failed for a document or query.
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Training error: {0}")]
    Training(String),
}

pub type IndexResult<T> = Result<T, IndexError>;

impl From<IndexError> for AppError {
    fn from(err: IndexError) -> Self {
        AppError::Index(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_message() {
        let err = IndexError::DimensionMismatch {
            expected: 384,
            actual: 3,
        };
        assert_eq!(err.to_string(), "Dimension mismatch: expected 384, got 3");
    }

    #[test]
    fn test_into_app_error() {
        let app: AppError = IndexError::NotFound("tt0001".to_string()).into();
        assert!(matches!(app, AppError::Index(msg) if msg.contains("tt0001")));
    }
}
