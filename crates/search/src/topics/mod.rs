//! Manuscript topic extraction
//!
//! An LLM-backed extractor is used when an API key is configured; otherwise
//! a pattern-based heuristic extractor runs locally.

mod heuristic;
mod llm;

pub use heuristic::HeuristicTopicExtractor;
pub use llm::LlmTopicExtractor;

use reviewer_finder_common::config::LlmConfig;
use reviewer_finder_common::errors::Result;
use reviewer_finder_common::models::{ExtractedTopics, ManuscriptQuery};
use std::sync::Arc;

/// Turns a manuscript into structured research topics
#[async_trait::async_trait]
pub trait TopicExtractor: Send + Sync {
    async fn extract(&self, query: &ManuscriptQuery) -> Result<ExtractedTopics>;

    fn name(&self) -> &'static str;
}

/// Create the extractor matching the LLM configuration
pub fn create_topic_extractor(config: &LlmConfig) -> Result<Arc<dyn TopicExtractor>> {
    match config.usable_api_key() {
        Some(key) => {
            let key = key.to_string();
            Ok(Arc::new(LlmTopicExtractor::new(config, key)?))
        }
        None => {
            tracing::info!("No LLM API key configured, using heuristic topic extraction");
            Ok(Arc::new(HeuristicTopicExtractor::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_key_selects_heuristic() {
        let config = LlmConfig {
            api_key: Some("your-api-key".into()),
            ..Default::default()
        };
        assert_eq!(create_topic_extractor(&config).unwrap().name(), "heuristic");

        let config = LlmConfig {
            api_key: Some("sk-ant-real".into()),
            ..Default::default()
        };
        assert_eq!(create_topic_extractor(&config).unwrap().name(), "llm");
    }
}
