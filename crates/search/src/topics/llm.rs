//! Topic extraction through an Anthropic-style messages endpoint

use super::TopicExtractor;
use reviewer_finder_common::config::LlmConfig;
use reviewer_finder_common::errors::{AppError, Result};
use reviewer_finder_common::models::{ExtractedTopics, ManuscriptQuery};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct LlmTopicExtractor {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

fn extraction_error(message: impl Into<String>) -> AppError {
    AppError::ExtractionFailure {
        message: message.into(),
    }
}

impl LlmTopicExtractor {
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    fn prompt(query: &ManuscriptQuery) -> String {
        let keywords = query.clean_keywords();
        let keywords = if keywords.is_empty() {
            "None provided".to_string()
        } else {
            keywords.join(", ")
        };

        format!(
            "Analyze this academic paper and extract structured information for finding peer reviewers.\n\n\
             Title: {}\n\
             Abstract: {}\n\
             Keywords: {}\n\n\
             Return a JSON object with these fields:\n\
             - \"primary_domains\": list of 2-4 primary research domains\n\
             - \"methodologies\": list of 1-3 methodologies used\n\
             - \"sub_topics\": list of 3-5 specific sub-topics\n\
             - \"expanded_terms\": list of 5-8 related search terms a reviewer might publish about\n\
             - \"interdisciplinary_bridges\": list of 0-2 fields this paper bridges\n\n\
             Return ONLY valid JSON, no other text.",
            query.title, query.abstract_text, keywords
        )
    }
}

/// Remove a surrounding Markdown code fence, if any
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    // Drop the opening fence line, which may carry a language tag
    let body = trimmed.split_once('\n').map_or("", |(_, rest)| rest);
    let body = match body.rfind("```") {
        Some(end) => &body[..end],
        None => body,
    };
    body.trim()
}

/// Parse the model's reply into topics
fn parse_topics(raw: &str) -> Result<ExtractedTopics> {
    let topics: ExtractedTopics = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| extraction_error(format!("model returned invalid JSON: {}", e)))?;
    Ok(topics.normalized())
}

#[async_trait::async_trait]
impl TopicExtractor for LlmTopicExtractor {
    #[tracing::instrument(skip(self, query), fields(model = %self.model))]
    async fn extract(&self, query: &ManuscriptQuery) -> Result<ExtractedTopics> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content: Self::prompt(query),
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| extraction_error(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(extraction_error(format!("API error {}: {}", status, body)));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| extraction_error(format!("failed to parse response: {}", e)))?;

        let text = parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| extraction_error("response contained no text block"))?;

        parse_topics(&text)
    }

    fn name(&self) -> &'static str {
        "llm"
    }
}
