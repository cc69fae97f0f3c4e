//! Qdrant adapter over the REST API

use super::{AuthorPayload, IndexPoint, PayloadFilter, VectorHit, VectorIndex};
use reviewer_finder_common::config::VectorIndexConfig;
use reviewer_finder_common::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

pub struct QdrantIndex {
    client: reqwest::Client,
    base_url: String,
    collection: String,
    batch_size: usize,
}

#[derive(Serialize)]
struct UpsertPoint<'a> {
    id: String,
    vector: &'a [f32],
    payload: &'a AuthorPayload,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    score: f32,
    #[serde(default)]
    payload: Option<AuthorPayload>,
}

fn retrieval_error(context: &str, e: impl std::fmt::Display) -> AppError {
    AppError::RetrievalFailure {
        message: format!("{}: {}", context, e),
    }
}

impl QdrantIndex {
    pub fn new(config: &VectorIndexConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: format!("http://{}:{}", config.host, config.port),
            collection: config.collection.clone(),
            batch_size: config.upsert_batch_size.max(1),
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.base_url, self.collection)
    }

    async fn check(response: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(retrieval_error(context, format!("status {}: {}", status, body)))
    }

    fn search_body(vector: &[f32], limit: usize, filter: &PayloadFilter) -> serde_json::Value {
        json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
            "filter": {
                "must": [
                    { "key": "works_count", "range": { "gte": filter.min_works_count } }
                ]
            }
        })
    }
}

#[async_trait::async_trait]
impl VectorIndex for QdrantIndex {
    #[tracing::instrument(skip(self, vector), fields(collection = %self.collection))]
    async fn search(&self, vector: &[f32], limit: usize, filter: &PayloadFilter) -> Result<Vec<VectorHit>> {
        let url = format!("{}/points/search", self.collection_url());
        let response = self
            .client
            .post(&url)
            .json(&Self::search_body(vector, limit, filter))
            .send()
            .await
            .map_err(|e| retrieval_error("search request failed", e))?;

        let response = Self::check(response, "search rejected").await?;
        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| retrieval_error("invalid search response", e))?;

        let mut hits = Vec::with_capacity(parsed.result.len());
        for point in parsed.result {
            match point.payload {
                Some(payload) => hits.push(VectorHit {
                    author_id: payload.author_id,
                    similarity: point.score,
                }),
                None => tracing::warn!("Qdrant point without payload skipped"),
            }
        }
        hits.truncate(limit);
        Ok(hits)
    }

    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<usize> {
        let url = format!("{}/points?wait=true", self.collection_url());
        let mut written = 0;

        for batch in points.chunks(self.batch_size) {
            let body: Vec<UpsertPoint<'_>> = batch
                .iter()
                .map(|p| UpsertPoint {
                    id: p.point_id().to_string(),
                    vector: &p.vector,
                    payload: &p.payload,
                })
                .collect();

            let response = self
                .client
                .put(&url)
                .json(&json!({ "points": body }))
                .send()
                .await
                .map_err(|e| retrieval_error("upsert request failed", e))?;
            Self::check(response, "upsert rejected").await?;

            written += batch.len();
            tracing::debug!(written, total = points.len(), "Uploaded points");
        }

        Ok(written)
    }

    async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        let url = self.collection_url();
        let existing = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| retrieval_error("collection lookup failed", e))?;
        if existing.status().is_success() {
            return Ok(());
        }

        let response = self
            .client
            .put(&url)
            .json(&json!({ "vectors": { "size": dimension, "distance": "Cosine" } }))
            .send()
            .await
            .map_err(|e| retrieval_error("collection creation failed", e))?;
        Self::check(response, "collection creation rejected").await?;

        tracing::info!(collection = %self.collection, dimension, "Created Qdrant collection");
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let url = format!("{}/collections", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(3))
            .send()
            .await
            .map_err(|e| AppError::ServiceUnavailable {
                message: format!("Qdrant unreachable: {}", e),
            })?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::ServiceUnavailable {
                message: format!("Qdrant returned {}", response.status()),
            })
        }
    }

    fn backend(&self) -> &'static str {
        "qdrant"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_body_carries_works_filter() {
        let body = QdrantIndex::search_body(&[0.5, 0.5], 50, &PayloadFilter { min_works_count: 3 });
        assert_eq!(body["limit"], 50);
        assert_eq!(body["with_payload"], true);
        assert_eq!(body["filter"]["must"][0]["key"], "works_count");
        assert_eq!(body["filter"]["must"][0]["range"]["gte"], 3);
    }

    #[test]
    fn test_parses_search_response() {
        let raw = r#"{"result": [
            {"id": "x", "score": 0.91, "payload": {"author_id": "A1", "name": "Ada", "works_count": 9}},
            {"id": "y", "score": 0.80}
        ], "status": "ok"}"#;
        let parsed: SearchResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.result.len(), 2);
        assert_eq!(parsed.result[0].payload.as_ref().unwrap().author_id, "A1");
        assert!(parsed.result[1].payload.is_none());
    }

    #[test]
    fn test_collection_url() {
        let index = QdrantIndex::new(&VectorIndexConfig::default()).unwrap();
        assert_eq!(index.collection_url(), "http://localhost:6333/collections/author_embeddings");
    }
}
