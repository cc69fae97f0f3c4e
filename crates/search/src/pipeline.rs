//! Reviewer search orchestrator
//!
//! extraction -> embedding -> retrieval -> hydration -> scoring -> truncation
//! -> COI annotation -> contact enrichment
//!
//! Every stage is a transformation of its input; nothing here mutates
//! persistent state, so a search can be abandoned at any await point.

use chrono::{NaiveDate, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use reviewer_finder_common::config::{AppConfig, SearchConfig};
use reviewer_finder_common::embeddings::{self, Embedder};
use reviewer_finder_common::errors::{AppError, Result};
use reviewer_finder_common::metrics;
use reviewer_finder_common::models::{
    AuthorRecord, ExtractedTopics, ManuscriptQuery, RankedResult, RankedReviewer, SearchMetadata,
};
use reviewer_finder_common::store::CandidateStore;

use crate::coi::{CoiDetector, ConflictContext};
use crate::enrichment::ContactEnricher;
use crate::retrieval::{create_vector_index, PayloadFilter, VectorHit, VectorIndex};
use crate::scoring::{self, HeuristicScorer, ScoringContext, ScoringStrategy};
use crate::topics::{create_topic_extractor, TopicExtractor};

/// Per-request tuning, checked against the configured bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Candidates retrieved from the vector index
    pub search_depth: usize,
    /// Reviewers returned
    pub reviewer_count: usize,
}

impl SearchOptions {
    pub fn new(search_depth: usize, reviewer_count: usize) -> Self {
        Self {
            search_depth,
            reviewer_count,
        }
    }

    /// Configured defaults, with request overrides where given
    pub fn resolve(config: &SearchConfig, search_depth: Option<usize>, reviewer_count: Option<usize>) -> Self {
        Self {
            search_depth: search_depth.unwrap_or(config.search_depth.default),
            reviewer_count: reviewer_count.unwrap_or(config.reviewer_count.default),
        }
    }

    pub fn validate(&self, config: &SearchConfig) -> Result<()> {
        for (field, value, bounds) in [
            ("search_depth", self.search_depth, &config.search_depth),
            ("reviewer_count", self.reviewer_count, &config.reviewer_count),
        ] {
            if !bounds.contains(value) {
                return Err(AppError::Validation {
                    message: format!("{} must be between {} and {}, got {}", field, bounds.min, bounds.max, value),
                    field: Some(field.to_string()),
                });
            }
        }
        Ok(())
    }
}

/// Short stable identifier of a manuscript for log correlation
fn query_fingerprint(query: &ManuscriptQuery) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.title.as_bytes());
    hasher.update([0u8]);
    hasher.update(query.abstract_text.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..12].to_string()
}

fn extraction_failure(e: AppError) -> AppError {
    match e {
        AppError::ExtractionFailure { .. } => e,
        other => AppError::ExtractionFailure {
            message: other.to_string(),
        },
    }
}

fn embedding_failure(e: AppError) -> AppError {
    match e {
        AppError::EmbeddingFailure { .. } | AppError::EmbeddingTimeout { .. } => e,
        other => AppError::EmbeddingFailure {
            message: other.to_string(),
        },
    }
}

fn retrieval_failure(e: AppError) -> AppError {
    match e {
        AppError::RetrievalFailure { .. } => e,
        other => AppError::RetrievalFailure {
            message: other.to_string(),
        },
    }
}

/// Candidates that survived hydration, with hit bookkeeping
struct Hydrated {
    candidates: Vec<(AuthorRecord, f32)>,
    skipped: usize,
}

/// The reviewer search pipeline
///
/// Collaborators are shared trait objects; configuration is captured at
/// construction and never changes afterwards.
pub struct ReviewerFinder {
    extractor: Arc<dyn TopicExtractor>,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    store: Arc<dyn CandidateStore>,
    scorer: Arc<dyn ScoringStrategy>,
    detector: CoiDetector,
    enricher: Arc<ContactEnricher>,
    config: SearchConfig,
    reference_date: Option<NaiveDate>,
}

impl ReviewerFinder {
    /// Pipeline with the heuristic scorer and no contact enrichment
    pub fn new(
        extractor: Arc<dyn TopicExtractor>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn CandidateStore>,
        config: SearchConfig,
    ) -> Self {
        Self {
            extractor,
            embedder,
            index,
            store,
            scorer: Arc::new(HeuristicScorer::default()),
            detector: CoiDetector::new(),
            enricher: Arc::new(ContactEnricher::new(
                Vec::new(),
                std::time::Duration::from_secs(1),
                std::time::Duration::from_secs(1),
                1,
            )),
            config,
            reference_date: None,
        }
    }

    /// Wire every collaborator from application configuration
    pub fn from_config(config: &AppConfig, store: Arc<dyn CandidateStore>) -> Result<Self> {
        config.validate()?;

        let extractor = create_topic_extractor(&config.llm)?;
        let embedder = embeddings::create_embedder(&config.embedding)?;
        let index = create_vector_index(&config.vector_index)?;
        let enricher = ContactEnricher::from_config(&config.enrichment)?;

        info!(
            extractor = extractor.name(),
            embedding_model = embedder.model_name(),
            index = index.backend(),
            enrichment_sources = enricher.source_count(),
            "Reviewer finder configured"
        );

        Ok(Self::new(extractor, embedder, index, store, config.search.clone())
            .with_scorer(Arc::new(HeuristicScorer::new(config.scoring.weights)))
            .with_enricher(Arc::new(enricher)))
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn ScoringStrategy>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_enricher(mut self, enricher: Arc<ContactEnricher>) -> Self {
        self.enricher = enricher;
        self
    }

    /// Pin the date recency is measured against instead of using today
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn store(&self) -> &Arc<dyn CandidateStore> {
        &self.store
    }

    pub fn search_config(&self) -> &SearchConfig {
        &self.config
    }

    /// Rank reviewers for a manuscript
    #[instrument(skip_all, fields(search_depth = options.search_depth, reviewer_count = options.reviewer_count))]
    pub async fn find_reviewers(&self, query: &ManuscriptQuery, options: SearchOptions) -> Result<RankedResult> {
        let start = Instant::now();
        let result = self.run(query, options, start).await;

        let elapsed = start.elapsed().as_secs_f64();
        match &result {
            Ok(ranked) if ranked.is_empty() => metrics::record_search(elapsed, "empty", 0),
            Ok(ranked) => metrics::record_search(elapsed, "ok", ranked.len()),
            Err(e) => {
                metrics::record_search(elapsed, "error", 0);
                warn!(error = %e, code = e.code().as_code(), "Reviewer search failed");
            }
        }
        result
    }

    async fn run(&self, query: &ManuscriptQuery, options: SearchOptions, start: Instant) -> Result<RankedResult> {
        options.validate(&self.config)?;

        let reference_date = self.reference_date.unwrap_or_else(|| Utc::now().date_naive());
        info!(query = %query_fingerprint(query), "Reviewer search started");

        let mut metadata = SearchMetadata {
            search_depth: options.search_depth,
            reviewer_count: options.reviewer_count,
            ..Default::default()
        };

        // 1. Topics
        let stage = Instant::now();
        let mut topics = self.extractor.extract(query).await.map_err(extraction_failure)?;
        if topics.is_empty() {
            debug!("Topic extraction returned nothing, falling back to keywords");
            topics = ExtractedTopics::from_keywords(&query.keywords);
        }
        metrics::record_stage("extraction", stage.elapsed().as_secs_f64());

        // 2. Query vector
        let stage = Instant::now();
        let vector = self
            .embedder
            .embed(&embeddings::query_text(query))
            .await
            .map_err(embedding_failure)?;
        if vector.len() != self.embedder.dimension() {
            return Err(AppError::EmbeddingFailure {
                message: format!(
                    "query vector has dimension {}, expected {}",
                    vector.len(),
                    self.embedder.dimension()
                ),
            });
        }
        metrics::record_stage("embedding", stage.elapsed().as_secs_f64());

        // 3. Retrieval
        let stage = Instant::now();
        let filter = PayloadFilter {
            min_works_count: self.config.min_works_count,
        };
        let mut hits = self
            .index
            .search(&vector, options.search_depth, &filter)
            .await
            .map_err(retrieval_failure)?;
        hits.truncate(options.search_depth);
        metadata.vector_candidates = hits.len();
        metrics::record_stage("retrieval", stage.elapsed().as_secs_f64());

        if hits.is_empty() {
            info!("Vector index returned no candidates");
            metadata.elapsed_ms = start.elapsed().as_millis() as u64;
            return Ok(RankedResult::empty(topics, metadata));
        }

        // 4. Hydrate and cap
        let Hydrated { mut candidates, skipped } = self.hydrate(hits).await?;
        metadata.skipped_records = skipped;
        metrics::record_skipped_records(skipped);

        candidates.sort_by(|(a, sim_a), (b, sim_b)| sim_b.total_cmp(sim_a).then_with(|| a.id.cmp(&b.id)));
        candidates.truncate(self.config.max_scoring_candidates);
        metadata.scored_candidates = candidates.len();

        // 5-6. Score, sort, truncate
        let stage = Instant::now();
        let context = ScoringContext::new(query, topics.clone(), reference_date);
        let ranked = scoring::rank(self.scorer.as_ref(), &context, candidates, options.reviewer_count);
        metrics::record_stage("scoring", stage.elapsed().as_secs_f64());

        // 7. Conflicts, on the final set only
        let conflicts = self.conflict_context(query).await;
        let flags: Vec<_> = ranked
            .iter()
            .map(|c| self.detector.detect(&c.author, &conflicts))
            .collect();
        for flag in flags.iter().flatten() {
            metrics::record_coi_flag(flag.coi_type.as_str());
        }

        // Contact details for what is actually returned
        let stage = Instant::now();
        let (authors, scores): (Vec<_>, Vec<_>) = ranked.into_iter().map(|c| (c.author, c.score)).unzip();
        let authors = self.enricher.enrich_all(authors).await;
        metrics::record_stage("enrichment", stage.elapsed().as_secs_f64());

        let reviewers: Vec<RankedReviewer> = authors
            .into_iter()
            .zip(scores)
            .zip(flags)
            .enumerate()
            .map(|(i, ((author, score), coi_flags))| RankedReviewer {
                rank: i + 1,
                author,
                score,
                coi_flags,
            })
            .collect();

        metadata.final_reviewers = reviewers.len();
        metadata.elapsed_ms = start.elapsed().as_millis() as u64;

        info!(
            vector_candidates = metadata.vector_candidates,
            skipped = metadata.skipped_records,
            scored = metadata.scored_candidates,
            returned = metadata.final_reviewers,
            elapsed_ms = metadata.elapsed_ms,
            "Reviewer search finished"
        );

        Ok(RankedResult {
            topics,
            reviewers,
            metadata,
        })
    }

    /// Resolve hits to store records, dropping unknown, malformed or inactive ones
    async fn hydrate(&self, hits: Vec<VectorHit>) -> Result<Hydrated> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::with_capacity(hits.len());
        let mut skipped = 0;

        for hit in hits {
            if !seen.insert(hit.author_id.clone()) {
                continue;
            }

            let record = match self.store.get(&hit.author_id).await.map_err(retrieval_failure)? {
                Some(record) => record,
                None => {
                    skipped += 1;
                    warn!(author_id = %hit.author_id, "Indexed author missing from store, skipping");
                    continue;
                }
            };

            if let Err(e) = record.validate() {
                skipped += 1;
                warn!(author_id = %hit.author_id, error = %e, "Skipping malformed author record");
                continue;
            }

            if record.works_count < self.config.min_works_count {
                debug!(author_id = %record.id, works_count = record.works_count, "Stale index payload, below works filter");
                continue;
            }

            candidates.push((record, hit.similarity));
        }

        Ok(Hydrated { candidates, skipped })
    }

    /// Declared names and institutions, plus store records the declared authors resolve to
    async fn conflict_context(&self, query: &ManuscriptQuery) -> ConflictContext {
        let mut context = ConflictContext::from_query(query);

        for id in &query.author_ids {
            match self.store.get(id).await {
                Ok(Some(record)) => context.add_declared_author(&record),
                Ok(None) => debug!(author_id = %id, "Declared author id not in store"),
                Err(e) => warn!(author_id = %id, error = %e, "Declared author lookup failed"),
            }
        }

        for name in &query.author_names {
            match self.store.find_by_name(name).await {
                Ok(records) => records.iter().for_each(|r| context.add_declared_author(r)),
                Err(e) => warn!(name = %name, error = %e, "Declared author name lookup failed"),
            }
        }

        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::{IndexPoint, InMemoryVectorIndex};
    use crate::topics::HeuristicTopicExtractor;
    use reviewer_finder_common::embeddings::HashingEmbedder;
    use reviewer_finder_common::models::{CoiType, Severity};
    use reviewer_finder_common::store::InMemoryAuthorStore;

    const DIM: usize = 128;

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
    }

    fn author(id: &str, name: &str, works: u32, h_index: u32, topics: &[&str]) -> AuthorRecord {
        let mut record = AuthorRecord::new(id, name);
        record.works_count = works;
        record.h_index = h_index;
        record.institution = format!("University {}", id);
        record.topics = topics.iter().map(|t| t.to_string()).collect();
        record.research_summary = topics.join(". ");
        record.last_publication_date = NaiveDate::from_ymd_opt(2025, 3, 1);
        record
    }

    fn manuscript() -> ManuscriptQuery {
        ManuscriptQuery::new(
            "Seismic waveform inversion with deep learning",
            "We combine full waveform inversion and neural networks for subsurface imaging.",
            vec!["seismic inversion".into(), "deep learning".into()],
        )
    }

    async fn index_for(records: &[AuthorRecord]) -> Arc<InMemoryVectorIndex> {
        let embedder = HashingEmbedder::new(DIM);
        let index = Arc::new(InMemoryVectorIndex::new());
        let texts: Vec<String> = records.iter().map(embeddings::author_text).collect();
        let vectors = embedder.embed_batch(&texts).await.unwrap();
        let points = records.iter().zip(vectors).map(|(r, v)| IndexPoint::new(r, v)).collect();
        index.upsert(points).await.unwrap();
        index
    }

    async fn finder_with(
        indexed: &[AuthorRecord],
        stored: Vec<AuthorRecord>,
        config: SearchConfig,
    ) -> ReviewerFinder {
        let index = index_for(indexed).await;
        ReviewerFinder::new(
            Arc::new(HeuristicTopicExtractor::new()),
            Arc::new(HashingEmbedder::new(DIM)),
            index,
            Arc::new(InMemoryAuthorStore::from_records(stored)),
            config,
        )
        .with_reference_date(reference())
    }

    async fn finder(records: Vec<AuthorRecord>) -> ReviewerFinder {
        finder_with(&records.clone(), records, SearchConfig::default()).await
    }

    fn pool(eligible: usize, inactive: usize) -> Vec<AuthorRecord> {
        let topics: [&[&str]; 4] = [
            &["Seismic Imaging and Inversion", "Waveform tomography"],
            &["Deep learning", "Neural networks"],
            &["Glaciology", "Ice sheets"],
            &["Subsurface imaging", "Geophysics"],
        ];
        let active = (0..eligible).map(|i| {
            author(&format!("A{:03}", i), &format!("Active Person{}", i), 3 + i as u32, (i * 7 % 50) as u32, topics[i % 4])
        });
        let idle = (0..inactive).map(|i| {
            author(&format!("B{:03}", i), &format!("Idle Person{}", i), (i % 3) as u32, 20, topics[i % 4])
        });
        active.chain(idle).collect()
    }

    #[tokio::test]
    async fn test_works_filter_limits_result_size() {
        let finder = finder(pool(4, 16)).await;
        let result = finder.find_reviewers(&manuscript(), SearchOptions::new(50, 10)).await.unwrap();

        assert_eq!(result.len(), 4);
        assert_eq!(result.metadata.vector_candidates, 4);
        assert!(result.reviewers.iter().all(|r| r.author.works_count >= 3));
        let ranks: Vec<usize> = result.reviewers.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_result_is_sorted_with_similarity_tie_break() {
        let finder = finder(pool(40, 0)).await;
        let result = finder.find_reviewers(&manuscript(), SearchOptions::new(100, 30)).await.unwrap();

        assert_eq!(result.metadata.scored_candidates, 30);
        assert_eq!(result.len(), 30);
        for pair in result.reviewers.windows(2) {
            let (a, b) = (&pair[0].score, &pair[1].score);
            assert!(a.overall_score >= b.overall_score);
            if a.overall_score == b.overall_score {
                assert!(a.similarity >= b.similarity);
            }
        }
    }

    #[tokio::test]
    async fn test_scoring_cap_is_independent_of_depth() {
        let finder = finder(pool(60, 0)).await;
        let result = finder.find_reviewers(&manuscript(), SearchOptions::new(100, 3)).await.unwrap();
        assert_eq!(result.metadata.vector_candidates, 60);
        assert_eq!(result.metadata.scored_candidates, 30);
        assert_eq!(result.len(), 3);
    }

    #[tokio::test]
    async fn test_repeated_searches_are_identical() {
        let finder = finder(pool(25, 5)).await;
        let first = finder.find_reviewers(&manuscript(), SearchOptions::new(50, 10)).await.unwrap();
        let second = finder.find_reviewers(&manuscript(), SearchOptions::new(50, 10)).await.unwrap();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.reviewers.iter().zip(&second.reviewers) {
            assert_eq!(a.author.id, b.author.id);
            assert_eq!(a.score, b.score);
            assert_eq!(a.coi_flags, b.coi_flags);
        }
    }

    #[tokio::test]
    async fn test_out_of_range_options_are_rejected() {
        let finder = finder(pool(5, 0)).await;
        for options in [
            SearchOptions::new(19, 10),
            SearchOptions::new(101, 10),
            SearchOptions::new(50, 2),
            SearchOptions::new(50, 31),
        ] {
            let err = finder.find_reviewers(&manuscript(), options).await.unwrap_err();
            assert!(matches!(err, AppError::Validation { .. }), "{:?}", options);
        }
        assert!(finder.find_reviewers(&manuscript(), SearchOptions::new(20, 3)).await.is_ok());
        assert!(finder.find_reviewers(&manuscript(), SearchOptions::new(100, 30)).await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_index_gives_empty_result() {
        let finder = finder(Vec::new()).await;
        let result = finder.find_reviewers(&manuscript(), SearchOptions::new(50, 10)).await.unwrap();
        assert!(result.is_empty());
        assert_eq!(result.metadata.vector_candidates, 0);
        assert!(!result.topics.is_empty());
    }

    #[tokio::test]
    async fn test_missing_and_malformed_records_are_skipped() {
        let indexed = pool(6, 0);
        // A002 is indexed but absent from the store
        let stored: Vec<AuthorRecord> = indexed.iter().filter(|r| r.id != "A002").cloned().collect();
        let finder = finder_with(&indexed, stored, SearchConfig::default()).await;

        let result = finder.find_reviewers(&manuscript(), SearchOptions::new(50, 10)).await.unwrap();
        assert_eq!(result.len(), 5);
        assert_eq!(result.metadata.skipped_records, 1);
        assert!(result.reviewers.iter().all(|r| r.author.id != "A002"));
    }

    struct UnvalidatedStore(Vec<AuthorRecord>);

    #[async_trait::async_trait]
    impl CandidateStore for UnvalidatedStore {
        async fn get(&self, author_id: &str) -> Result<Option<AuthorRecord>> {
            Ok(self.0.iter().find(|r| r.id == author_id).cloned())
        }

        async fn find_by_name(&self, _name: &str) -> Result<Vec<AuthorRecord>> {
            Ok(Vec::new())
        }

        async fn filter_by_min_works(&self, min_works: u32) -> Result<Vec<AuthorRecord>> {
            Ok(self.0.iter().filter(|r| r.works_count >= min_works).cloned().collect())
        }

        async fn len(&self) -> Result<usize> {
            Ok(self.0.len())
        }
    }

    #[tokio::test]
    async fn test_record_without_name_is_skipped() {
        let indexed = pool(5, 0);
        let mut stored = indexed.clone();
        stored[0].name = "   ".into();

        let finder = ReviewerFinder::new(
            Arc::new(HeuristicTopicExtractor::new()),
            Arc::new(HashingEmbedder::new(DIM)),
            index_for(&indexed).await,
            Arc::new(UnvalidatedStore(stored)),
            SearchConfig::default(),
        )
        .with_reference_date(reference());

        let result = finder.find_reviewers(&manuscript(), SearchOptions::new(50, 10)).await.unwrap();
        assert_eq!(result.len(), 4);
        assert_eq!(result.metadata.skipped_records, 1);
    }

    /// Store whose reads all fail
    struct UnreachableStore;

    #[async_trait::async_trait]
    impl CandidateStore for UnreachableStore {
        async fn get(&self, _author_id: &str) -> Result<Option<AuthorRecord>> {
            Err(AppError::Store {
                message: "disk gone".into(),
            })
        }

        async fn find_by_name(&self, _name: &str) -> Result<Vec<AuthorRecord>> {
            Err(AppError::Store {
                message: "disk gone".into(),
            })
        }

        async fn filter_by_min_works(&self, _min_works: u32) -> Result<Vec<AuthorRecord>> {
            Err(AppError::Store {
                message: "disk gone".into(),
            })
        }

        async fn len(&self) -> Result<usize> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_store_failure_during_hydration_is_retrieval_failure() {
        let indexed = pool(1, 0);
        let finder = ReviewerFinder::new(
            Arc::new(HeuristicTopicExtractor::new()),
            Arc::new(HashingEmbedder::new(DIM)),
            index_for(&indexed).await,
            Arc::new(UnreachableStore),
            SearchConfig::default(),
        )
        .with_reference_date(reference());

        let err = finder
            .find_reviewers(&manuscript(), SearchOptions::new(50, 10))
            .await
            .unwrap_err();
        match err {
            AppError::RetrievalFailure { message } => assert!(message.contains("disk gone")),
            other => panic!("expected retrieval failure, got {:?}", other),
        }
    }

    struct EmptyExtractor;

    #[async_trait::async_trait]
    impl TopicExtractor for EmptyExtractor {
        async fn extract(&self, _query: &ManuscriptQuery) -> Result<ExtractedTopics> {
            Ok(ExtractedTopics::default())
        }

        fn name(&self) -> &'static str {
            "empty"
        }
    }

    struct FailingExtractor;

    #[async_trait::async_trait]
    impl TopicExtractor for FailingExtractor {
        async fn extract(&self, _query: &ManuscriptQuery) -> Result<ExtractedTopics> {
            Err(AppError::ServiceUnavailable {
                message: "LLM down".into(),
            })
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    struct FailingEmbedder;

    #[async_trait::async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(AppError::Internal {
                message: "model crashed".into(),
            })
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(AppError::Internal {
                message: "model crashed".into(),
            })
        }

        fn model_name(&self) -> &str {
            "failing"
        }

        fn dimension(&self) -> usize {
            DIM
        }
    }

    struct FailingIndex;

    #[async_trait::async_trait]
    impl VectorIndex for FailingIndex {
        async fn search(&self, _vector: &[f32], _limit: usize, _filter: &PayloadFilter) -> Result<Vec<VectorHit>> {
            Err(AppError::ServiceUnavailable {
                message: "connection refused".into(),
            })
        }

        async fn upsert(&self, _points: Vec<IndexPoint>) -> Result<usize> {
            Ok(0)
        }

        async fn ensure_collection(&self, _dimension: usize) -> Result<()> {
            Ok(())
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }

        fn backend(&self) -> &'static str {
            "failing"
        }
    }

    fn base_finder(
        extractor: Arc<dyn TopicExtractor>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
    ) -> ReviewerFinder {
        ReviewerFinder::new(
            extractor,
            embedder,
            index,
            Arc::new(InMemoryAuthorStore::new()),
            SearchConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_collaborator_failures_have_distinct_kinds() {
        let options = SearchOptions::new(50, 10);
        let memory: Arc<dyn VectorIndex> = Arc::new(InMemoryVectorIndex::new());

        let err = base_finder(Arc::new(FailingExtractor), Arc::new(HashingEmbedder::new(DIM)), memory.clone())
            .find_reviewers(&manuscript(), options)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ExtractionFailure { .. }));

        let err = base_finder(Arc::new(HeuristicTopicExtractor::new()), Arc::new(FailingEmbedder), memory.clone())
            .find_reviewers(&manuscript(), options)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EmbeddingFailure { .. }));

        let err = base_finder(
            Arc::new(HeuristicTopicExtractor::new()),
            Arc::new(HashingEmbedder::new(DIM)),
            Arc::new(FailingIndex),
        )
        .find_reviewers(&manuscript(), options)
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::RetrievalFailure { .. }));
    }

    /// Reports one dimension but returns another
    struct MisconfiguredEmbedder;

    #[async_trait::async_trait]
    impl Embedder for MisconfiguredEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.1; DIM / 2])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![vec![0.1; DIM / 2]; texts.len()])
        }

        fn model_name(&self) -> &str {
            "misconfigured"
        }

        fn dimension(&self) -> usize {
            DIM
        }
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_embedding_failure() {
        let err = base_finder(
            Arc::new(HeuristicTopicExtractor::new()),
            Arc::new(MisconfiguredEmbedder),
            Arc::new(InMemoryVectorIndex::new()),
        )
        .find_reviewers(&manuscript(), SearchOptions::new(50, 10))
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::EmbeddingFailure { .. }));
    }

    #[tokio::test]
    async fn test_empty_topics_fall_back_to_keywords() {
        let records = pool(5, 0);
        let finder = ReviewerFinder::new(
            Arc::new(EmptyExtractor),
            Arc::new(HashingEmbedder::new(DIM)),
            index_for(&records).await,
            Arc::new(InMemoryAuthorStore::from_records(records)),
            SearchConfig::default(),
        )
        .with_reference_date(reference());

        let result = finder.find_reviewers(&manuscript(), SearchOptions::new(50, 10)).await.unwrap();
        assert_eq!(result.topics.primary_domains, vec!["seismic inversion", "deep learning"]);
        assert_eq!(result.len(), 5);
    }

    #[tokio::test]
    async fn test_conflicts_are_flagged_on_final_reviewers() {
        let mut records = pool(6, 0);
        records[0].name = "Jane Smith".into();
        records[0].institution = "MIT".into();
        // Declared author, resolved by name, lists A001 as a co-author
        let mut declared = author("D001", "Declared Writer", 1, 5, &["Unrelated"]);
        declared.co_author_ids = vec!["A001".into()];
        records.push(declared);

        let finder = finder(records).await;
        let query = manuscript()
            .with_authors(vec!["jane smith".into(), "Declared Writer".into()])
            .with_institutions(vec!["Massachusetts Institute of Technology (MIT)".into()]);

        let result = finder.find_reviewers(&query, SearchOptions::new(50, 10)).await.unwrap();
        let flags_of = |id: &str| {
            result
                .reviewers
                .iter()
                .find(|r| r.author.id == id)
                .map(|r| r.coi_flags.iter().map(|f| (f.coi_type, f.severity)).collect::<Vec<_>>())
                .unwrap()
        };

        let jane = flags_of("A000");
        assert!(jane.contains(&(CoiType::ExactNameMatch, Severity::Critical)));
        assert!(jane.contains(&(CoiType::SameInstitution, Severity::Medium)));
        assert_eq!(flags_of("A001"), vec![(CoiType::CoAuthorship, Severity::High)]);
        assert!(flags_of("A002").is_empty());
        // The declared author has too few works to be retrieved at all
        assert!(result.reviewers.iter().all(|r| r.author.id != "D001"));
    }

    #[test]
    fn test_options_resolve_defaults() {
        let config = SearchConfig::default();
        assert_eq!(SearchOptions::resolve(&config, None, None), SearchOptions::new(50, 10));
        assert_eq!(SearchOptions::resolve(&config, Some(80), None), SearchOptions::new(80, 10));
    }

    #[test]
    fn test_fingerprint_is_stable_and_short() {
        let a = query_fingerprint(&manuscript());
        assert_eq!(a.len(), 12);
        assert_eq!(a, query_fingerprint(&manuscript()));
        assert_ne!(a, query_fingerprint(&ManuscriptQuery::new("Other", "", vec![])));
    }
}
