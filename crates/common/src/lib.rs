//! ReviewerFinder Common Library
//!
//! Shared code for the ReviewerFinder services including:
//! - Domain models (manuscripts, authors, scores, COI flags)
//! - Candidate store
//! - Embedding client abstraction
//! - Error types and handling
//! - Configuration management
//! - Text normalization shared by indexing and search
//! - Metrics and observability

pub mod config;
pub mod embeddings;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod store;
pub mod text;

// Re-export commonly used types
pub use errors::{AppError, Result};
pub use config::AppConfig;
pub use embeddings::Embedder;
pub use store::{CandidateStore, InMemoryAuthorStore};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";

/// Default embedding dimension
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;
