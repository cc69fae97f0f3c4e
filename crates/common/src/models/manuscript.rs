//! Manuscript query and the topics extracted from it

use serde::{Deserialize, Serialize};

/// Keywords promoted to primary domains when topic extraction comes back empty
const FALLBACK_DOMAIN_KEYWORDS: usize = 3;

/// The manuscript a reviewer search is run for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManuscriptQuery {
    pub title: String,

    #[serde(rename = "abstract")]
    pub abstract_text: String,

    #[serde(default)]
    pub keywords: Vec<String>,

    /// Declared author names, used for conflict detection
    #[serde(default)]
    pub author_names: Vec<String>,

    /// Declared author institutions, used for conflict detection
    #[serde(default)]
    pub author_institutions: Vec<String>,

    /// Candidate-store ids of the declared authors, when known
    #[serde(default)]
    pub author_ids: Vec<String>,
}

impl ManuscriptQuery {
    pub fn new(
        title: impl Into<String>,
        abstract_text: impl Into<String>,
        keywords: Vec<String>,
    ) -> Self {
        Self {
            title: title.into(),
            abstract_text: abstract_text.into(),
            keywords,
            ..Default::default()
        }
    }

    pub fn with_authors(mut self, names: Vec<String>) -> Self {
        self.author_names = names;
        self
    }

    pub fn with_institutions(mut self, institutions: Vec<String>) -> Self {
        self.author_institutions = institutions;
        self
    }

    pub fn with_author_ids(mut self, ids: Vec<String>) -> Self {
        self.author_ids = ids;
        self
    }

    /// Keywords with surrounding whitespace removed and blanks dropped
    pub fn clean_keywords(&self) -> Vec<String> {
        self.keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Structured research topics of a manuscript
///
/// Each list holds distinct entries; the struct is never mutated after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedTopics {
    #[serde(default)]
    pub primary_domains: Vec<String>,
    #[serde(default)]
    pub methodologies: Vec<String>,
    #[serde(default)]
    pub sub_topics: Vec<String>,
    #[serde(default)]
    pub expanded_terms: Vec<String>,
    #[serde(default)]
    pub interdisciplinary_bridges: Vec<String>,
}

impl ExtractedTopics {
    /// True when every list is empty
    pub fn is_empty(&self) -> bool {
        self.primary_domains.is_empty()
            && self.methodologies.is_empty()
            && self.sub_topics.is_empty()
            && self.expanded_terms.is_empty()
            && self.interdisciplinary_bridges.is_empty()
    }

    /// Keyword-only topics used when extraction yields nothing
    pub fn from_keywords(keywords: &[String]) -> Self {
        let keywords = dedup(keywords.iter().map(|k| k.trim().to_string()));
        Self {
            primary_domains: keywords.iter().take(FALLBACK_DOMAIN_KEYWORDS).cloned().collect(),
            sub_topics: keywords,
            ..Default::default()
        }
    }

    /// Remove blanks and duplicates from every list, keeping first occurrences
    pub fn normalized(self) -> Self {
        Self {
            primary_domains: dedup(self.primary_domains),
            methodologies: dedup(self.methodologies),
            sub_topics: dedup(self.sub_topics),
            expanded_terms: dedup(self.expanded_terms),
            interdisciplinary_bridges: dedup(self.interdisciplinary_bridges),
        }
    }
}

fn dedup<I: IntoIterator<Item = String>>(items: I) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
        .collect()
}
