//! Indexer error types

use reviewer_finder_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("OpenAlex request failed: {0}")]
    OpenAlex(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector index error: {0}")]
    VectorIndex(String),

    #[error("Author store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<AppError> for IndexerError {
    fn from(e: AppError) -> Self {
        match e {
            AppError::EmbeddingFailure { .. } | AppError::EmbeddingTimeout { .. } => {
                IndexerError::Embedding(e.to_string())
            }
            AppError::RetrievalFailure { .. } | AppError::ServiceUnavailable { .. } => {
                IndexerError::VectorIndex(e.to_string())
            }
            AppError::HttpClient(inner) => IndexerError::Http(inner),
            other => IndexerError::Store(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, IndexerError>;
