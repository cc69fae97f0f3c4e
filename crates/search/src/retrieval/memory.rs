//! Brute-force cosine index held in memory

use super::{IndexPoint, PayloadFilter, VectorHit, VectorIndex};
use reviewer_finder_common::embeddings::cosine_similarity;
use reviewer_finder_common::errors::{AppError, Result};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryVectorIndex {
    points: RwLock<HashMap<Uuid, IndexPoint>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.points.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.points.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn search(&self, vector: &[f32], limit: usize, filter: &PayloadFilter) -> Result<Vec<VectorHit>> {
        let points = self.points.read().await;

        let mut hits = Vec::new();
        for point in points.values() {
            if point.payload.works_count < filter.min_works_count {
                continue;
            }
            if point.vector.len() != vector.len() {
                return Err(AppError::RetrievalFailure {
                    message: format!(
                        "query dimension {} does not match indexed dimension {}",
                        vector.len(),
                        point.vector.len()
                    ),
                });
            }
            hits.push(VectorHit {
                author_id: point.payload.author_id.clone(),
                similarity: cosine_similarity(vector, &point.vector),
            });
        }

        hits.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.author_id.cmp(&b.author_id))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<usize> {
        let mut stored = self.points.write().await;
        let count = points.len();
        for point in points {
            stored.insert(point.point_id(), point);
        }
        Ok(count)
    }

    async fn ensure_collection(&self, _dimension: usize) -> Result<()> {
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reviewer_finder_common::models::AuthorRecord;

    fn point(id: &str, works: u32, vector: Vec<f32>) -> IndexPoint {
        let mut record = AuthorRecord::new(id, format!("Author {}", id));
        record.works_count = works;
        IndexPoint::new(&record, vector)
    }

    #[tokio::test]
    async fn test_search_orders_and_filters() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert(vec![
                point("A1", 10, vec![1.0, 0.0]),
                point("A2", 10, vec![0.6, 0.8]),
                point("A3", 2, vec![1.0, 0.0]),
                point("A4", 3, vec![-1.0, 0.0]),
            ])
            .await
            .unwrap();

        let hits = index
            .search(&[1.0, 0.0], 10, &PayloadFilter { min_works_count: 3 })
            .await
            .unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.author_id.as_str()).collect();
        assert_eq!(ids, vec!["A1", "A2", "A4"]);
        assert!((hits[2].similarity + 1.0).abs() < 1e-6);

        let hits = index
            .search(&[1.0, 0.0], 1, &PayloadFilter { min_works_count: 3 })
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_same_author() {
        let index = InMemoryVectorIndex::new();
        index.upsert(vec![point("A1", 5, vec![1.0, 0.0])]).await.unwrap();
        index.upsert(vec![point("A1", 5, vec![0.0, 1.0])]).await.unwrap();
        assert_eq!(index.len().await, 1);

        let hits = index.search(&[0.0, 1.0], 5, &PayloadFilter::default()).await.unwrap();
        assert!((hits[0].similarity - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_retrieval_failure() {
        let index = InMemoryVectorIndex::new();
        index.upsert(vec![point("A1", 5, vec![1.0, 0.0, 0.0])]).await.unwrap();
        let err = index.search(&[1.0, 0.0], 5, &PayloadFilter::default()).await.unwrap_err();
        assert!(matches!(err, AppError::RetrievalFailure { .. }));
    }
}
