//! Weighted four-dimension heuristic scorer

use super::{ScoringContext, ScoringStrategy};
use chrono::{Months, NaiveDate};
use reviewer_finder_common::config::ScoringWeights;
use reviewer_finder_common::models::{AuthorRecord, CandidateScore};
use reviewer_finder_common::text;

const MAX_SCORE: f64 = 10.0;

/// Topic score reached when every query term matches, before capping
const TOPIC_SCALE: f64 = 15.0;

/// Multiplier applied to the (non-negative) cosine similarity
const METHODOLOGY_SCALE: f64 = 12.0;

/// (minimum h-index, score), highest tier first
const SENIORITY_TIERS: &[(u32, f64)] = &[(40, 9.5), (25, 8.5), (15, 7.5), (8, 6.5), (3, 5.0)];
const SENIORITY_FLOOR: f64 = 3.0;

/// (maximum years since last publication, score), most recent tier first
const RECENCY_TIERS: &[(u32, f64)] = &[(1, 9.5), (2, 8.5), (3, 7.0), (5, 5.0)];
const RECENCY_FLOOR: f64 = 3.0;

/// Seniority from the h-index; tiers are inclusive on their lower bound
pub fn seniority_score(h_index: u32) -> f64 {
    SENIORITY_TIERS
        .iter()
        .find(|(min, _)| h_index >= *min)
        .map_or(SENIORITY_FLOOR, |(_, score)| *score)
}

/// Recency from the last publication date
///
/// "Within N years" means the publication date plus N calendar years is on or
/// after the reference date. A missing date falls in the oldest tier.
pub fn recency_score(last_publication: Option<NaiveDate>, reference: NaiveDate) -> f64 {
    let Some(published) = last_publication else {
        return RECENCY_FLOOR;
    };

    RECENCY_TIERS
        .iter()
        .find(|(years, _)| {
            published
                .checked_add_months(Months::new(12 * years))
                .map_or(true, |limit| limit >= reference)
        })
        .map_or(RECENCY_FLOOR, |(_, score)| *score)
}

/// Share of query terms found among the words of the candidate's topics
fn topic_score(candidate: &AuthorRecord, query_terms: &[String]) -> f64 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let topic_words = text::word_set(&candidate.topics);
    let matches = query_terms.iter().filter(|t| topic_words.contains(*t)).count();
    (matches as f64 / query_terms.len() as f64 * TOPIC_SCALE).min(MAX_SCORE)
}

fn methodology_score(similarity: f32) -> f64 {
    let similarity = f64::from(similarity);
    if !similarity.is_finite() {
        return 0.0;
    }
    (similarity.max(0.0) * METHODOLOGY_SCALE).min(MAX_SCORE)
}

/// Heuristic stand-in for a learned reranker
#[derive(Debug, Clone, Default)]
pub struct HeuristicScorer {
    weights: ScoringWeights,
}

impl HeuristicScorer {
    /// Weights are expected to be validated already (see `ScoringWeights::validate`)
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }
}

impl ScoringStrategy for HeuristicScorer {
    fn score(&self, candidate: &AuthorRecord, context: &ScoringContext, similarity: f32) -> CandidateScore {
        let topic = topic_score(candidate, &context.query_terms);
        let methodology = methodology_score(similarity);
        let seniority = seniority_score(candidate.h_index);
        let recency = recency_score(candidate.last_publication_date, context.reference_date);

        let overall = topic * self.weights.topic
            + methodology * self.weights.methodology
            + seniority * self.weights.seniority
            + recency * self.weights.recency;

        CandidateScore {
            author_id: candidate.id.clone(),
            topic_score: topic,
            methodology_score: methodology,
            seniority_score: seniority,
            recency_score: recency,
            overall_score: overall.clamp(0.0, MAX_SCORE),
            similarity,
        }
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reviewer_finder_common::models::{ExtractedTopics, ManuscriptQuery};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_seniority_boundaries() {
        assert_eq!(seniority_score(40), 9.5);
        assert_eq!(seniority_score(39), 8.5);
        assert_eq!(seniority_score(25), 8.5);
        assert_eq!(seniority_score(15), 7.5);
        assert_eq!(seniority_score(14), 6.5);
        assert_eq!(seniority_score(8), 6.5);
        assert_eq!(seniority_score(3), 5.0);
        assert_eq!(seniority_score(2), 3.0);
        assert_eq!(seniority_score(0), 3.0);
    }

    #[test]
    fn test_recency_boundaries() {
        let today = date(2026, 1, 15);
        assert_eq!(recency_score(Some(date(2025, 1, 15)), today), 9.5);
        // 1.01 years is a little under four days past the one-year mark
        assert_eq!(recency_score(Some(date(2025, 1, 11)), today), 8.5);
        assert_eq!(recency_score(Some(date(2024, 1, 15)), today), 8.5);
        assert_eq!(recency_score(Some(date(2023, 1, 14)), today), 5.0);
        assert_eq!(recency_score(Some(date(2021, 1, 15)), today), 5.0);
        assert_eq!(recency_score(Some(date(2021, 1, 14)), today), 3.0);
        assert_eq!(recency_score(None, today), 3.0);
        assert_eq!(recency_score(Some(date(2026, 6, 1)), today), 9.5);
    }

    #[test]
    fn test_recency_leap_day() {
        // Feb 29 plus one year clamps to Feb 28
        assert_eq!(recency_score(Some(date(2024, 2, 29)), date(2025, 2, 28)), 9.5);
        assert_eq!(recency_score(Some(date(2024, 2, 29)), date(2025, 3, 1)), 8.5);
    }

    #[test]
    fn test_methodology_clamps_negative_and_large_similarity() {
        assert_eq!(methodology_score(-0.4), 0.0);
        assert_eq!(methodology_score(0.0), 0.0);
        assert!((methodology_score(0.5) - 6.0).abs() < 1e-6);
        assert_eq!(methodology_score(0.95), 10.0);
        assert_eq!(methodology_score(f32::NAN), 0.0);
    }

    #[test]
    fn test_topic_score_counts_word_matches() {
        let mut candidate = AuthorRecord::new("A1", "Ada");
        candidate.topics = vec!["Seismic Imaging and Inversion".into(), "Waveform tomography".into()];

        let terms: Vec<String> = ["seismic", "inversion", "waveform", "glacier"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        // 3 of 4 terms, scaled by 15 and capped at 10
        assert_eq!(topic_score(&candidate, &terms), 10.0);

        let terms: Vec<String> = ["seismic", "glacier", "ocean", "river", "lake", "delta"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!((topic_score(&candidate, &terms) - 2.5).abs() < 1e-9);
        assert_eq!(topic_score(&candidate, &[]), 0.0);
    }

    #[test]
    fn test_overall_is_weighted_sum() {
        let mut candidate = AuthorRecord::new("A1", "Ada");
        candidate.h_index = 40;
        candidate.last_publication_date = Some(date(2025, 6, 1));
        candidate.topics = vec!["protein folding".into()];

        let query = ManuscriptQuery::new("Protein folding dynamics", "", vec![]);
        let context = ScoringContext::new(&query, ExtractedTopics::default(), date(2026, 1, 15));
        let score = HeuristicScorer::default().score(&candidate, &context, 0.5);

        // topic: 2 of 3 terms -> 10; methodology 6; seniority 9.5; recency 9.5
        let expected = 10.0 * 0.40 + 6.0 * 0.25 + 9.5 * 0.15 + 9.5 * 0.20;
        assert!((score.overall_score - expected).abs() < 1e-6);
        assert_eq!(score.author_id, "A1");
        assert_eq!(score.similarity, 0.5);
    }

    #[test]
    fn test_missing_optional_fields_never_fail() {
        let candidate = AuthorRecord::new("A1", "Ada");
        let context = ScoringContext::new(&ManuscriptQuery::default(), ExtractedTopics::default(), date(2026, 1, 15));
        let score = HeuristicScorer::default().score(&candidate, &context, -1.0);

        assert_eq!(score.topic_score, 0.0);
        assert_eq!(score.methodology_score, 0.0);
        assert_eq!(score.seniority_score, 3.0);
        assert_eq!(score.recency_score, 3.0);
        assert!((score.overall_score - (3.0 * 0.15 + 3.0 * 0.20)).abs() < 1e-9);
    }
}
