//! Vector retrieval
//!
//! The index stores one vector per author, keyed by a UUIDv5 of the author id,
//! with a small payload used for filtering. Two backends:
//! - Qdrant over its REST API
//! - an in-memory brute-force cosine index for local runs and tests

mod memory;
mod qdrant;

pub use memory::InMemoryVectorIndex;
pub use qdrant::QdrantIndex;

use reviewer_finder_common::config::VectorIndexConfig;
use reviewer_finder_common::embeddings::{author_text, Embedder};
use reviewer_finder_common::errors::{AppError, Result};
use reviewer_finder_common::models::AuthorRecord;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// One nearest-neighbor hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    pub author_id: String,
    /// Cosine similarity in [-1, 1]
    pub similarity: f32,
}

/// Payload predicate applied by the index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PayloadFilter {
    pub min_works_count: u32,
}

/// Payload stored alongside each vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorPayload {
    pub author_id: String,
    pub name: String,
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub works_count: u32,
    #[serde(default)]
    pub h_index: u32,
}

impl From<&AuthorRecord> for AuthorPayload {
    fn from(record: &AuthorRecord) -> Self {
        Self {
            author_id: record.id.clone(),
            name: record.name.clone(),
            institution: record.institution.clone(),
            works_count: record.works_count,
            h_index: record.h_index,
        }
    }
}

/// A vector ready to be written to the index
#[derive(Debug, Clone)]
pub struct IndexPoint {
    pub vector: Vec<f32>,
    pub payload: AuthorPayload,
}

impl IndexPoint {
    pub fn new(record: &AuthorRecord, vector: Vec<f32>) -> Self {
        Self {
            vector,
            payload: AuthorPayload::from(record),
        }
    }

    pub fn point_id(&self) -> Uuid {
        point_id(&self.payload.author_id)
    }
}

/// Deterministic point id, so re-indexing an author overwrites its entry
pub fn point_id(author_id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, author_id.as_bytes())
}

/// Nearest-neighbor search over author vectors
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Up to `limit` hits passing `filter`, highest similarity first
    ///
    /// The order of hits with equal similarity is unspecified.
    async fn search(&self, vector: &[f32], limit: usize, filter: &PayloadFilter) -> Result<Vec<VectorHit>>;

    /// Insert or overwrite points; returns the number written
    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<usize>;

    /// Create the backing collection if needed
    async fn ensure_collection(&self, dimension: usize) -> Result<()>;

    /// Check the backend is reachable
    async fn ping(&self) -> Result<()>;

    fn backend(&self) -> &'static str;
}

/// Create a vector index based on configuration
pub fn create_vector_index(config: &VectorIndexConfig) -> Result<Arc<dyn VectorIndex>> {
    match config.backend.as_str() {
        "qdrant" => Ok(Arc::new(QdrantIndex::new(config)?)),
        "memory" => Ok(Arc::new(InMemoryVectorIndex::new())),
        other => Err(AppError::Configuration {
            message: format!("unknown vector index backend: {}", other),
        }),
    }
}

/// Embed author records in batches and upsert them; returns points written
///
/// Uses the same text construction as search-time candidates, so vectors from
/// here and from the indexer share one space.
pub async fn index_authors(
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    records: &[AuthorRecord],
    batch_size: usize,
) -> Result<usize> {
    let mut written = 0;
    for batch in records.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(author_text).collect();
        let vectors = embedder.embed_batch(&texts).await?;
        if vectors.len() != batch.len() {
            return Err(AppError::EmbeddingFailure {
                message: format!("expected {} vectors, got {}", batch.len(), vectors.len()),
            });
        }

        let points = batch
            .iter()
            .zip(vectors)
            .map(|(record, vector)| IndexPoint::new(record, vector))
            .collect();
        written += index.upsert(points).await?;
        tracing::debug!(written, total = records.len(), "Indexed author batch");
    }
    Ok(written)
}
