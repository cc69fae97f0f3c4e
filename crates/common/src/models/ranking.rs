//! Search output: scores, conflict flags and the ranked reviewer list

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{AuthorRecord, ExtractedTopics};

/// Per-candidate scores for one search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub author_id: String,
    pub topic_score: f64,
    pub methodology_score: f64,
    pub seniority_score: f64,
    pub recency_score: f64,
    /// Weighted sum of the sub-scores, in [0, 10]
    pub overall_score: f64,
    /// Raw cosine similarity reported by the vector index
    pub similarity: f32,
}

/// Kind of conflict between a candidate and the manuscript's authors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoiType {
    CoAuthorship,
    SameInstitution,
    ExactNameMatch,
    LastNameMatch,
}

impl CoiType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoiType::CoAuthorship => "co_authorship",
            CoiType::SameInstitution => "same_institution",
            CoiType::ExactNameMatch => "exact_name_match",
            CoiType::LastNameMatch => "last_name_match",
        }
    }
}

/// Ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoiFlag {
    #[serde(rename = "type")]
    pub coi_type: CoiType,
    pub severity: Severity,
    pub explanation: String,
}

/// One entry of the ranked result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedReviewer {
    /// 1-based position in the result
    pub rank: usize,
    pub author: AuthorRecord,
    pub score: CandidateScore,
    pub coi_flags: Vec<CoiFlag>,
}

/// Bookkeeping about how a result was produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMetadata {
    pub search_depth: usize,
    pub reviewer_count: usize,
    /// Hits returned by the vector index
    pub vector_candidates: usize,
    /// Hits dropped because their record was missing or malformed
    pub skipped_records: usize,
    /// Candidates that went through scoring
    pub scored_candidates: usize,
    pub final_reviewers: usize,
    pub elapsed_ms: u64,
}

/// Ranked reviewers for one manuscript, best first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedResult {
    pub topics: ExtractedTopics,
    pub reviewers: Vec<RankedReviewer>,
    pub metadata: SearchMetadata,
}

impl RankedResult {
    /// Valid result with no reviewers
    pub fn empty(topics: ExtractedTopics, metadata: SearchMetadata) -> Self {
        Self {
            topics,
            reviewers: Vec::new(),
            metadata,
        }
    }

    pub fn len(&self) -> usize {
        self.reviewers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviewers.is_empty()
    }
}
