//! ReviewerFinder search pipeline
//!
//! - `topics`: manuscript topic extraction (heuristic or LLM)
//! - `retrieval`: vector index adapters (Qdrant REST, in-memory)
//! - `scoring`: four-dimension candidate scoring and ranking
//! - `coi`: conflict-of-interest detection
//! - `enrichment`: contact lookups against OpenAlex and ORCID
//! - `pipeline`: the orchestrator tying the stages together

pub mod coi;
pub mod enrichment;
pub mod pipeline;
pub mod retrieval;
pub mod scoring;
pub mod topics;

pub use coi::{CoiDetector, ConflictContext};
pub use pipeline::{ReviewerFinder, SearchOptions};
pub use retrieval::{create_vector_index, index_authors, InMemoryVectorIndex, IndexPoint, VectorHit, VectorIndex};
pub use scoring::{HeuristicScorer, ScoringContext, ScoringStrategy};
pub use topics::{create_topic_extractor, TopicExtractor};
