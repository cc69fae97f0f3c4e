//! Candidate scoring and ranking
//!
//! Scoring is a strategy behind [`ScoringStrategy`] so a learned or LLM-based
//! reranker can replace the heuristic without touching the orchestrator.

mod heuristic;

pub use heuristic::{recency_score, seniority_score, HeuristicScorer};

use chrono::NaiveDate;
use reviewer_finder_common::models::{AuthorRecord, CandidateScore, ExtractedTopics, ManuscriptQuery};
use reviewer_finder_common::text;

/// Per-search inputs shared by every candidate's scoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringContext {
    /// Distinct lower-cased content words of the manuscript title and abstract
    pub query_terms: Vec<String>,
    pub topics: ExtractedTopics,
    /// Date recency is measured against, fixed once per search
    pub reference_date: NaiveDate,
}

impl ScoringContext {
    pub fn new(query: &ManuscriptQuery, topics: ExtractedTopics, reference_date: NaiveDate) -> Self {
        Self {
            query_terms: text::query_terms(&query.title, &query.abstract_text),
            topics,
            reference_date,
        }
    }
}

/// Computes a candidate's sub-scores and overall score
///
/// Implementations must be pure: the same inputs always give the same score,
/// independent of other candidates and of evaluation order.
pub trait ScoringStrategy: Send + Sync {
    fn score(&self, candidate: &AuthorRecord, context: &ScoringContext, similarity: f32) -> CandidateScore;

    fn name(&self) -> &'static str;
}

/// A candidate paired with its index similarity
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub author: AuthorRecord,
    pub score: CandidateScore,
}

/// Score and order candidates, best first, keeping at most `limit`
///
/// Candidates are first ordered by similarity (descending, author id as the
/// final key), then stably sorted by overall score, so equal overall scores
/// keep the higher-similarity candidate first.
pub fn rank(
    strategy: &dyn ScoringStrategy,
    context: &ScoringContext,
    mut candidates: Vec<(AuthorRecord, f32)>,
    limit: usize,
) -> Vec<ScoredCandidate> {
    candidates.sort_by(|(a, sim_a), (b, sim_b)| sim_b.total_cmp(sim_a).then_with(|| a.id.cmp(&b.id)));

    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .map(|(author, similarity)| {
            let score = strategy.score(&author, context, similarity);
            ScoredCandidate { author, score }
        })
        .collect();

    scored.sort_by(|a, b| b.score.overall_score.total_cmp(&a.score.overall_score));
    scored.truncate(limit);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    fn scorer() -> HeuristicScorer {
        HeuristicScorer::default()
    }

    fn context() -> ScoringContext {
        let query = ManuscriptQuery::new(
            "Graph neural networks for protein folding",
            "Protein structure prediction with geometric deep learning.",
            vec![],
        );
        ScoringContext::new(
            &query,
            ExtractedTopics::default(),
            NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
        )
    }

    fn author(id: &str, h_index: u32) -> AuthorRecord {
        let mut record = AuthorRecord::new(id, format!("Author {}", id));
        record.h_index = h_index;
        record.topics = vec!["Protein Folding".into()];
        record
    }

    #[test]
    fn test_rank_orders_by_overall_then_similarity() {
        let candidates = vec![
            (author("A3", 10), 0.50),
            (author("A1", 45), 0.60),
            (author("A2", 10), 0.70),
            (author("A4", 10), 0.70),
        ];
        let ranked = rank(&scorer(), &context(), candidates, 10);
        let ids: Vec<&str> = ranked.iter().map(|c| c.author.id.as_str()).collect();

        // A1 wins on seniority; A2 and A4 tie and fall back to id order
        assert_eq!(ids, vec!["A1", "A2", "A4", "A3"]);
    }

    #[test]
    fn test_equal_overall_prefers_higher_similarity() {
        // Similarities above 10/12 saturate methodology, so overall scores tie
        let candidates = vec![(author("A1", 10), 0.90), (author("A2", 10), 0.95)];
        let ranked = rank(&scorer(), &context(), candidates, 10);
        assert_eq!(ranked[0].score.overall_score, ranked[1].score.overall_score);
        assert_eq!(ranked[0].author.id, "A2");
    }

    #[test]
    fn test_rank_truncates() {
        let candidates = (0..20).map(|i| (author(&format!("A{:02}", i), i), 0.5)).collect();
        let ranked = rank(&scorer(), &context(), candidates, 5);
        assert_eq!(ranked.len(), 5);
        assert!(rank(&scorer(), &context(), Vec::new(), 5).is_empty());
    }

    #[test]
    fn test_rank_is_idempotent() {
        let candidates: Vec<(AuthorRecord, f32)> = (0..30)
            .map(|i| (author(&format!("A{:02}", i), i % 7 * 6), (i % 5) as f32 / 5.0))
            .collect();
        let first = rank(&scorer(), &context(), candidates.clone(), 10);
        let mut shuffled = candidates;
        shuffled.reverse();
        let second = rank(&scorer(), &context(), shuffled, 10);

        let ids = |r: &[ScoredCandidate]| r.iter().map(|c| c.author.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.score, b.score);
        }
    }

    #[test]
    fn test_scores_stay_in_range_for_random_inputs() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let scorer = scorer();
        let context = context();

        for i in 0..500 {
            let mut record = author(&format!("R{}", i), rng.gen_range(0..200));
            if rng.gen_bool(0.8) {
                let days = rng.gen_range(-400..5000);
                record.last_publication_date = NaiveDate::from_ymd_opt(2026, 1, 15)
                    .and_then(|d| d.checked_sub_signed(chrono::Duration::days(days)));
            }
            let similarity = rng.gen_range(-1.0f32..=1.0);
            let score = scorer.score(&record, &context, similarity);

            for value in [
                score.topic_score,
                score.methodology_score,
                score.seniority_score,
                score.recency_score,
                score.overall_score,
            ] {
                assert!((0.0..=10.0).contains(&value), "out of range: {:?}", score);
            }
            assert_eq!(score, scorer.score(&record, &context, similarity));
        }
    }
}
