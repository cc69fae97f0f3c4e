//! Author record: one candidate reviewer

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, Result};

/// Research topics kept per author
pub const MAX_TOPICS: usize = 15;

/// Co-author identifiers kept per author
pub const MAX_CO_AUTHORS: usize = 50;

pub const OPENALEX_PREFIX: &str = "https://openalex.org/";

/// Contact details, filled at indexing time and by enrichment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orcid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orcid_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_scholar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution_page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openalex_url: Option<String>,
}

impl ContactInfo {
    /// Fill fields that are still empty from `other`; known values are never replaced
    pub fn merge_missing(&mut self, other: ContactInfo) {
        fn fill(slot: &mut Option<String>, value: Option<String>) {
            if slot.as_deref().map_or(true, str::is_empty) {
                if let Some(v) = value.filter(|v| !v.is_empty()) {
                    *slot = Some(v);
                }
            }
        }

        fill(&mut self.email, other.email);
        fill(&mut self.orcid, other.orcid);
        fill(&mut self.orcid_url, other.orcid_url);
        fill(&mut self.homepage, other.homepage);
        fill(&mut self.google_scholar, other.google_scholar);
        fill(&mut self.institution_page, other.institution_page);
        fill(&mut self.openalex_url, other.openalex_url);
    }

    pub fn has_email(&self) -> bool {
        self.email.as_deref().is_some_and(|e| !e.is_empty())
    }
}

/// A candidate reviewer as stored in the candidate store
///
/// Created once during indexing; read-only during search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorRecord {
    /// Stable identifier (an OpenAlex author URL for ingested records)
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub institution: String,

    #[serde(default)]
    pub country: String,

    #[serde(default)]
    pub topics: Vec<String>,

    #[serde(default)]
    pub h_index: u32,

    #[serde(default)]
    pub citation_count: u64,

    #[serde(default)]
    pub works_count: u32,

    #[serde(default)]
    pub last_publication_date: Option<NaiveDate>,

    #[serde(default)]
    pub co_author_ids: Vec<String>,

    #[serde(default)]
    pub contact: ContactInfo,

    /// Concatenated recent abstracts, used only to build the embedding text
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub research_summary: String,
}

impl AuthorRecord {
    /// Minimal record, mostly useful for tests and fixtures
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            institution: String::new(),
            country: String::new(),
            topics: Vec::new(),
            h_index: 0,
            citation_count: 0,
            works_count: 0,
            last_publication_date: None,
            co_author_ids: Vec::new(),
            contact: ContactInfo::default(),
            research_summary: String::new(),
        }
    }

    /// Required fields are present
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(AppError::MalformedAuthorRecord {
                id: self.id.clone(),
                reason: "missing identifier".to_string(),
            });
        }
        if self.name.trim().is_empty() {
            return Err(AppError::MalformedAuthorRecord {
                id: self.id.clone(),
                reason: "missing name".to_string(),
            });
        }
        Ok(())
    }

    /// Enforce the per-record size limits on topics and co-authors
    pub fn bounded(mut self) -> Self {
        self.topics.retain(|t| !t.trim().is_empty());
        self.topics.truncate(MAX_TOPICS);
        self.co_author_ids.retain(|c| !c.is_empty() && *c != self.id);
        self.co_author_ids.truncate(MAX_CO_AUTHORS);
        self
    }

    /// Last whitespace-delimited token of the name
    pub fn last_name(&self) -> Option<&str> {
        self.name.split_whitespace().last()
    }

    /// Short OpenAlex key (`A123…`) when the id is an OpenAlex author URL or key
    pub fn openalex_key(&self) -> Option<&str> {
        let key = self.id.strip_prefix(OPENALEX_PREFIX).unwrap_or(&self.id);
        let is_key = key.starts_with('A') && key.len() > 1 && key[1..].bytes().all(|b| b.is_ascii_digit());
        is_key.then_some(key)
    }

    pub fn has_co_author(&self, author_id: &str) -> bool {
        self.co_author_ids.iter().any(|c| c == author_id)
    }
}
