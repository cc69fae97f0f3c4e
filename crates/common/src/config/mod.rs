//! Configuration management for ReviewerFinder services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml, config/local.toml)
//! - Default values
//!
//! Configuration is read once at process start and handed to components as an
//! immutable value; nothing reads it from global state afterwards.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{AppError, Result};

/// Tolerance used when checking that scoring weights sum to one
const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Vector index (Qdrant) configuration
    #[serde(default)]
    pub vector_index: VectorIndexConfig,

    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Candidate retrieval and ranking limits
    #[serde(default)]
    pub search: SearchConfig,

    /// Scoring weights
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Local author store
    #[serde(default)]
    pub store: StoreConfig,

    /// Contact enrichment
    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    /// LLM topic extraction
    #[serde(default)]
    pub llm: LlmConfig,

    /// OpenAlex harvesting for the indexer
    #[serde(default)]
    pub ingestion: IngestionConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum concurrent requests
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VectorIndexConfig {
    /// Backend: qdrant, memory
    #[serde(default = "default_index_backend")]
    pub backend: String,

    /// Qdrant host
    #[serde(default = "default_index_host")]
    pub host: String,

    /// Qdrant REST port
    #[serde(default = "default_index_port")]
    pub port: u16,

    /// Collection holding one point per author
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Request timeout in seconds
    #[serde(default = "default_index_timeout")]
    pub timeout_secs: u64,

    /// Points per upsert request
    #[serde(default = "default_upsert_batch")]
    pub upsert_batch_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: openai (any OpenAI-compatible endpoint), hashing
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for embedding service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries
    #[serde(default = "default_embedding_retries")]
    pub max_retries: u32,

    /// Batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

/// Inclusive range with a default, used for request-tunable limits
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct Bounds {
    pub min: usize,
    pub max: usize,
    pub default: usize,
}

impl Bounds {
    pub const fn new(min: usize, max: usize, default: usize) -> Self {
        Self { min, max, default }
    }

    pub fn contains(&self, value: usize) -> bool {
        (self.min..=self.max).contains(&value)
    }

    fn is_consistent(&self) -> bool {
        self.min <= self.default && self.default <= self.max
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Candidates need at least this many works to be retrieved
    #[serde(default = "default_min_works")]
    pub min_works_count: u32,

    /// Upper bound on candidates handed to the scoring stage
    #[serde(default = "default_max_scoring_candidates")]
    pub max_scoring_candidates: usize,

    /// Number of candidates retrieved from the vector index
    #[serde(default = "default_search_depth")]
    pub search_depth: Bounds,

    /// Number of reviewers returned
    #[serde(default = "default_reviewer_count")]
    pub reviewer_count: Bounds,
}

/// Relative weight of each sub-score in the overall score
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct ScoringWeights {
    #[serde(default = "default_topic_weight")]
    pub topic: f64,
    #[serde(default = "default_methodology_weight")]
    pub methodology: f64,
    #[serde(default = "default_seniority_weight")]
    pub seniority: f64,
    #[serde(default = "default_recency_weight")]
    pub recency: f64,
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.topic + self.methodology + self.seniority + self.recency
    }

    /// Weights must be non-negative and sum to one
    pub fn validate(&self) -> Result<()> {
        let all = [self.topic, self.methodology, self.seniority, self.recency];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(AppError::Configuration {
                message: format!("scoring weights must be finite and non-negative: {:?}", self),
            });
        }
        if (self.sum() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(AppError::Configuration {
                message: format!("scoring weights sum to {} instead of 1.0", self.sum()),
            });
        }
        Ok(())
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            topic: default_topic_weight(),
            methodology: default_methodology_weight(),
            seniority: default_seniority_weight(),
            recency: default_recency_weight(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights: ScoringWeights,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// JSON file with one record per author
    #[serde(default = "default_authors_path")]
    pub authors_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnrichmentConfig {
    /// Enable external contact lookups
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Timeout for a single lookup in seconds
    #[serde(default = "default_enrichment_timeout")]
    pub timeout_secs: u64,

    /// Total retry budget for one lookup in seconds
    #[serde(default = "default_enrichment_retry_budget")]
    pub retry_budget_secs: u64,

    /// Reviewers enriched concurrently
    #[serde(default = "default_enrichment_concurrency")]
    pub max_concurrent: usize,

    /// OpenAlex API base URL
    #[serde(default = "default_openalex_base")]
    pub openalex_base: String,

    /// ORCID public API base URL
    #[serde(default = "default_orcid_base")]
    pub orcid_base: String,

    /// Contact email for the OpenAlex polite pool
    pub mailto: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// API key; the heuristic extractor is used when absent
    pub api_key: Option<String>,

    /// Messages endpoint
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    /// Model name
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Maximum output tokens
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,

    /// Timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl LlmConfig {
    /// Placeholder keys copied from sample env files count as absent
    pub fn usable_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty() && !k.starts_with("your-"))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestionConfig {
    /// Topics searched on OpenAlex to seed the author pool
    #[serde(default = "default_seed_topics")]
    pub seed_topics: Vec<String>,

    /// Authors requested per seed topic
    #[serde(default = "default_authors_per_topic")]
    pub authors_per_topic: usize,

    /// Recent works fetched per author to build the research summary
    #[serde(default = "default_works_per_author")]
    pub works_per_author: usize,

    /// Pause between paged OpenAlex requests, in milliseconds
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 60 }
fn default_max_concurrent() -> usize { 64 }
fn default_index_backend() -> String { "memory".to_string() }
fn default_index_host() -> String { "localhost".to_string() }
fn default_index_port() -> u16 { 6333 }
fn default_collection() -> String { "author_embeddings".to_string() }
fn default_index_timeout() -> u64 { 30 }
fn default_upsert_batch() -> usize { 100 }
fn default_embedding_provider() -> String { "hashing".to_string() }
fn default_embedding_model() -> String { crate::DEFAULT_EMBEDDING_MODEL.to_string() }
fn default_embedding_dimension() -> usize { crate::DEFAULT_EMBEDDING_DIMENSION }
fn default_embedding_timeout() -> u64 { 30 }
fn default_embedding_retries() -> u32 { 3 }
fn default_batch_size() -> usize { 32 }
fn default_min_works() -> u32 { 3 }
fn default_max_scoring_candidates() -> usize { 30 }
fn default_search_depth() -> Bounds { Bounds::new(20, 100, 50) }
fn default_reviewer_count() -> Bounds { Bounds::new(3, 30, 10) }
fn default_topic_weight() -> f64 { 0.40 }
fn default_methodology_weight() -> f64 { 0.25 }
fn default_seniority_weight() -> f64 { 0.15 }
fn default_recency_weight() -> f64 { 0.20 }
fn default_authors_path() -> String { "data/authors.json".to_string() }
fn default_enrichment_timeout() -> u64 { 10 }
fn default_enrichment_retry_budget() -> u64 { 20 }
fn default_enrichment_concurrency() -> usize { 5 }
fn default_openalex_base() -> String { "https://api.openalex.org".to_string() }
fn default_orcid_base() -> String { "https://pub.orcid.org/v3.0".to_string() }
fn default_llm_endpoint() -> String { "https://api.anthropic.com/v1/messages".to_string() }
fn default_llm_model() -> String { "claude-sonnet-4-5-20250929".to_string() }
fn default_llm_max_tokens() -> u32 { 1024 }
fn default_llm_timeout() -> u64 { 30 }
fn default_seed_topics() -> Vec<String> {
    [
        "machine learning",
        "natural language processing",
        "computer vision",
        "climate change",
        "genomics",
        "quantum computing",
        "neuroscience",
        "renewable energy",
        "public health epidemiology",
        "materials science",
        "astrophysics",
        "behavioral economics",
        "organic chemistry",
        "robotics",
        "cybersecurity",
    ]
    .iter()
    .map(|t| t.to_string())
    .collect()
}
fn default_authors_per_topic() -> usize { 20 }
fn default_works_per_author() -> usize { 5 }
fn default_request_delay() -> u64 { 100 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_service_name() -> String { "reviewer-finder".to_string() }
fn default_rate_limit() -> u32 { 20 }
fn default_burst() -> u32 { 40 }
fn default_enabled() -> bool { true }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__SEARCH__SEARCH_DEPTH__DEFAULT=60
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reject internally inconsistent settings
    pub fn validate(&self) -> Result<()> {
        self.scoring.weights.validate()?;

        for (name, bounds) in [
            ("search.search_depth", &self.search.search_depth),
            ("search.reviewer_count", &self.search.reviewer_count),
        ] {
            if !bounds.is_consistent() {
                return Err(AppError::Configuration {
                    message: format!("{} bounds are inconsistent: {:?}", name, bounds),
                });
            }
        }

        if self.search.max_scoring_candidates == 0 {
            return Err(AppError::Configuration {
                message: "search.max_scoring_candidates must be positive".to_string(),
            });
        }

        if self.embedding.dimension == 0 {
            return Err(AppError::Configuration {
                message: "embedding.dimension must be positive".to_string(),
            });
        }

        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Base URL of the Qdrant REST API
    pub fn vector_index_url(&self) -> String {
        format!("http://{}:{}", self.vector_index.host, self.vector_index.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            max_concurrent_requests: default_max_concurrent(),
        }
    }
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            backend: default_index_backend(),
            host: default_index_host(),
            port: default_index_port(),
            collection: default_collection(),
            timeout_secs: default_index_timeout(),
            upsert_batch_size: default_upsert_batch(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            api_base: None,
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout(),
            max_retries: default_embedding_retries(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_works_count: default_min_works(),
            max_scoring_candidates: default_max_scoring_candidates(),
            search_depth: default_search_depth(),
            reviewer_count: default_reviewer_count(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            authors_path: default_authors_path(),
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            timeout_secs: default_enrichment_timeout(),
            retry_budget_secs: default_enrichment_retry_budget(),
            max_concurrent: default_enrichment_concurrency(),
            openalex_base: default_openalex_base(),
            orcid_base: default_orcid_base(),
            mailto: None,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            max_tokens: default_llm_max_tokens(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            seed_topics: default_seed_topics(),
            authors_per_topic: default_authors_per_topic(),
            works_per_author: default_works_per_author(),
            request_delay_ms: default_request_delay(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            service_name: default_service_name(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}
