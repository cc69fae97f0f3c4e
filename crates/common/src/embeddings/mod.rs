//! Embedding service abstraction
//!
//! Two providers sit behind the [`Embedder`] trait:
//! - `openai`: any OpenAI-compatible `/embeddings` endpoint (including
//!   self-hosted sentence-transformer servers serving all-MiniLM-L6-v2)
//! - `hashing`: deterministic feature hashing, no network, used for
//!   local runs and tests
//!
//! Query and author texts are built here so that indexing and search
//! always embed the same shapes of text.

use crate::config::EmbeddingConfig;
use crate::errors::{AppError, Result};
use crate::models::{AuthorRecord, ManuscriptQuery};
use crate::text;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Topics included in an author's embedding text
const AUTHOR_TEXT_TOPICS: usize = 10;

/// Characters of the research summary included in an author's embedding text
const AUTHOR_TEXT_SUMMARY_CHARS: usize = 2000;

/// Trait for embedding generation
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;
}

/// Text embedded for a manuscript query
pub fn query_text(query: &ManuscriptQuery) -> String {
    let mut out = format!("Title: {}\nAbstract: {}", query.title, query.abstract_text);
    let keywords = query.clean_keywords();
    if !keywords.is_empty() {
        out.push_str("\nKeywords: ");
        out.push_str(&keywords.join(", "));
    }
    out
}

/// Text embedded for an author at indexing time
pub fn author_text(author: &AuthorRecord) -> String {
    let mut parts = Vec::with_capacity(3);

    if !author.institution.is_empty() {
        parts.push(format!("Researcher at {}.", author.institution));
    }
    if !author.topics.is_empty() {
        let topics: Vec<&str> = author
            .topics
            .iter()
            .take(AUTHOR_TEXT_TOPICS)
            .map(String::as_str)
            .collect();
        parts.push(format!("Research topics: {}.", topics.join(", ")));
    }
    if !author.research_summary.is_empty() {
        parts.push(text::truncate_chars(&author.research_summary, AUTHOR_TEXT_SUMMARY_CHARS).to_string());
    }

    if parts.is_empty() {
        author.name.clone()
    } else {
        parts.join(" ")
    }
}

/// Client for an OpenAI-compatible embeddings endpoint
pub struct HttpEmbedder {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    dimension: usize,
    base_url: String,
    max_retries: u32,
    batch_size: usize,
    timeout: Duration,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let base_url = config
            .api_base
            .clone()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| AppError::Configuration {
                message: "embedding.api_base is required for the openai provider".to_string(),
            })?;

        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            model: config.model.clone(),
            dimension: config.dimension,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries.max(1),
            batch_size: config.batch_size.max(1),
            timeout,
        })
    }

    /// Make request with retry
    async fn request_with_retry(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut last_error = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(100 * 2_u64.pow(attempt));
                tokio::time::sleep(delay).await;
            }

            match self.make_request(texts).await {
                Ok(embeddings) => return Ok(embeddings),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        error = %e,
                        "Embedding request failed, retrying"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::EmbeddingFailure {
            message: "no attempt was made".to_string(),
        }))
    }

    async fn make_request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);
        let request = EmbeddingRequest {
            input: texts,
            model: &self.model,
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::EmbeddingTimeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                }
            } else {
                AppError::EmbeddingFailure {
                    message: format!("request failed: {}", e),
                }
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::EmbeddingFailure {
                message: format!("API error {}: {}", status, text::truncate_chars(&body, 200)),
            });
        }

        let result: EmbeddingResponse = response.json().await.map_err(|e| {
            AppError::EmbeddingFailure {
                message: format!("failed to parse response: {}", e),
            }
        })?;

        self.collect_vectors(result.data, texts.len())
    }

    /// Order response items by index, check their shape and normalize them
    fn collect_vectors(&self, mut items: Vec<EmbeddingItem>, expected: usize) -> Result<Vec<Vec<f32>>> {
        if items.len() != expected {
            return Err(AppError::EmbeddingFailure {
                message: format!("expected {} embeddings, got {}", expected, items.len()),
            });
        }
        items.sort_by_key(|item| item.index.unwrap_or(usize::MAX));

        let mut vectors: Vec<Vec<f32>> = items.into_iter().map(|item| item.embedding).collect();
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(AppError::EmbeddingFailure {
                message: format!(
                    "model {} returned dimension {}, expected {}",
                    self.model,
                    bad.len(),
                    self.dimension
                ),
            });
        }
        vectors.iter_mut().for_each(|v| l2_normalize(v));
        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let result = self
            .request_with_retry(&[text.to_string()])
            .await
            .and_then(|v| {
                v.into_iter().next().ok_or_else(|| AppError::EmbeddingFailure {
                    message: "empty response".to_string(),
                })
            });
        crate::metrics::record_embedding(start.elapsed().as_secs_f64(), &self.model, 1, result.is_ok());
        result
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.batch_size) {
            let start = Instant::now();
            let result = self.request_with_retry(chunk).await;
            crate::metrics::record_embedding(
                start.elapsed().as_secs_f64(),
                &self.model,
                chunk.len(),
                result.is_ok(),
            );
            all_embeddings.extend(result?);
        }

        Ok(all_embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Deterministic bag-of-words embedder
///
/// Each content word and adjacent word pair is hashed with SHA-256 into a
/// signed bucket; the result is L2-normalized. Texts sharing vocabulary end
/// up with positive cosine similarity, which is enough for local runs.
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn bucket(&self, feature: &str) -> (usize, f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let mut index_bytes = [0u8; 8];
        index_bytes.copy_from_slice(&digest[..8]);
        let index = (u64::from_le_bytes(index_bytes) % self.dimension as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }

    fn embed_sync(&self, input: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let tokens = text::content_words(input, 3);

        for token in &tokens {
            let (index, sign) = self.bucket(token);
            vector[index] += sign;
        }
        for pair in tokens.windows(2) {
            let (index, sign) = self.bucket(&format!("{} {}", pair[0], pair[1]));
            vector[index] += 0.5 * sign;
        }

        l2_normalize(&mut vector);
        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_sync(t)).collect())
    }

    fn model_name(&self) -> &str {
        "feature-hashing"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Create an embedder based on configuration
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(HttpEmbedder::new(config)?)),
        "hashing" => Ok(Arc::new(HashingEmbedder::new(config.dimension))),
        other => Err(AppError::Configuration {
            message: format!("unknown embedding provider: {}", other),
        }),
    }
}

/// Scale to unit length in place; zero vectors are left as is
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Cosine similarity; zero when either vector has no magnitude
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
