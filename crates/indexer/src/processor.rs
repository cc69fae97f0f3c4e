//! Harvest and index processors
//!
//! `Harvester` turns seed topics into author records; `IndexProcessor`
//! embeds records and writes them to the vector index.

use reviewer_finder_common::embeddings::Embedder;
use reviewer_finder_common::metrics;
use reviewer_finder_common::models::AuthorRecord;
use reviewer_finder_search::{index_authors, VectorIndex};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::errors::Result;
use crate::openalex::{build_profile, AuthorSource, RawAuthor};

/// Counts from one harvest run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestReport {
    pub topics_failed: usize,
    pub unique_authors: usize,
    pub works_failed: usize,
    pub without_summary: usize,
    pub kept: usize,
}

pub struct Harvester {
    source: Arc<dyn AuthorSource>,
    authors_per_topic: usize,
    works_per_author: usize,
    delay: Duration,
}

impl Harvester {
    pub fn new(source: Arc<dyn AuthorSource>, authors_per_topic: usize, works_per_author: usize) -> Self {
        Self {
            source,
            authors_per_topic,
            works_per_author,
            delay: Duration::ZERO,
        }
    }

    /// Pause between per-author requests
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fetch authors for every topic and build their profiles
    ///
    /// A failing topic or author is logged and skipped. Authors whose recent
    /// works carry no abstract are dropped, since they would embed poorly.
    #[instrument(skip(self, topics), fields(topics = topics.len()))]
    pub async fn harvest(&self, topics: &[String]) -> (Vec<AuthorRecord>, HarvestReport) {
        let mut report = HarvestReport::default();
        let mut seen = HashSet::new();
        let mut raw_authors: Vec<RawAuthor> = Vec::new();

        for topic in topics {
            match self.source.authors_by_topic(topic, self.authors_per_topic).await {
                Ok(authors) => {
                    let fetched = authors.len();
                    raw_authors.extend(
                        authors
                            .into_iter()
                            .filter(|a| !a.id.is_empty() && seen.insert(a.id.clone())),
                    );
                    info!(topic = %topic, fetched, unique = raw_authors.len(), "Fetched authors for topic");
                }
                Err(e) => {
                    report.topics_failed += 1;
                    warn!(topic = %topic, error = %e, "Failed to fetch authors for topic");
                }
            }
        }
        report.unique_authors = raw_authors.len();

        let mut records = Vec::new();
        for (i, raw) in raw_authors.into_iter().enumerate() {
            let works = match self.source.recent_works(&raw.id, self.works_per_author).await {
                Ok(works) => works,
                Err(e) => {
                    report.works_failed += 1;
                    warn!(author_id = %raw.id, error = %e, "Failed to fetch works");
                    continue;
                }
            };

            let record = build_profile(raw, &works);
            if record.research_summary.is_empty() {
                report.without_summary += 1;
                debug!(author_id = %record.id, "No abstracts, dropping author");
            } else {
                records.push(record);
            }

            if (i + 1) % 50 == 0 {
                info!(processed = i + 1, total = report.unique_authors, kept = records.len(), "Harvest progress");
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        report.kept = records.len();
        info!(?report, "Harvest complete");
        (records, report)
    }
}

/// Embeds author records and upserts them into the vector index
pub struct IndexProcessor {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    batch_size: usize,
}

impl IndexProcessor {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, batch_size: usize) -> Self {
        Self {
            embedder,
            index,
            batch_size,
        }
    }

    /// Returns the number of points written
    #[instrument(skip(self, records), fields(records = records.len(), model = %self.embedder.model_name()))]
    pub async fn process(&self, records: &[AuthorRecord]) -> Result<usize> {
        self.index.ensure_collection(self.embedder.dimension()).await?;

        let written = index_authors(
            self.embedder.as_ref(),
            self.index.as_ref(),
            records,
            self.batch_size,
        )
        .await?;

        metrics::record_indexed(written);
        info!(written, backend = self.index.backend(), "Author vectors indexed");
        Ok(written)
    }
}

/// Write records as the JSON array the candidate store loads
pub fn write_store(path: impl AsRef<Path>, records: &[AuthorRecord]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(records)?)?;
    info!(path = %path.display(), records = records.len(), "Author store written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::IndexerError;
    use crate::openalex::{AuthorRef, Authorship, RawWork};
    use reviewer_finder_common::embeddings::HashingEmbedder;
    use reviewer_finder_common::InMemoryAuthorStore;
    use reviewer_finder_search::InMemoryVectorIndex;
    use std::collections::HashMap;

    struct FakeSource {
        topics: HashMap<String, Vec<&'static str>>,
        /// Authors whose works have no abstract
        silent: Vec<&'static str>,
        /// Authors whose works request fails
        failing: Vec<&'static str>,
    }

    #[async_trait::async_trait]
    impl AuthorSource for FakeSource {
        async fn authors_by_topic(&self, topic: &str, count: usize) -> Result<Vec<RawAuthor>> {
            let ids = self
                .topics
                .get(topic)
                .ok_or_else(|| IndexerError::OpenAlex(format!("unknown topic {}", topic)))?;
            Ok(ids
                .iter()
                .take(count)
                .map(|id| RawAuthor {
                    id: id.to_string(),
                    display_name: Some(format!("Author {}", id)),
                    works_count: Some(10),
                    ..Default::default()
                })
                .collect())
        }

        async fn recent_works(&self, author_id: &str, _limit: usize) -> Result<Vec<RawWork>> {
            if self.failing.iter().any(|f| *f == author_id) {
                return Err(IndexerError::OpenAlex("503".into()));
            }
            let abstract_index = (!self.silent.iter().any(|s| *s == author_id)).then(|| {
                let mut index = HashMap::new();
                index.insert(format!("abstract-of-{}", author_id), vec![0]);
                index
            });
            Ok(vec![RawWork {
                id: format!("W-{}", author_id),
                abstract_inverted_index: abstract_index,
                publication_date: Some("2025-02-01".into()),
                authorships: Some(vec![Authorship {
                    author: Some(AuthorRef {
                        id: Some("A-shared".into()),
                    }),
                }]),
            }])
        }
    }

    fn source() -> Arc<FakeSource> {
        let mut topics = HashMap::new();
        topics.insert("genomics".to_string(), vec!["A1", "A2", "A3"]);
        topics.insert("robotics".to_string(), vec!["A3", "A4", "A5"]);
        Arc::new(FakeSource {
            topics,
            silent: vec!["A2"],
            failing: vec!["A5"],
        })
    }

    #[tokio::test]
    async fn test_harvest_dedupes_and_filters() {
        let harvester = Harvester::new(source(), 10, 5);
        let topics = vec!["genomics".to_string(), "robotics".to_string(), "astrology".to_string()];

        let (records, report) = harvester.harvest(&topics).await;
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();

        assert_eq!(ids, vec!["A1", "A3", "A4"]);
        assert_eq!(
            report,
            HarvestReport {
                topics_failed: 1,
                unique_authors: 5,
                works_failed: 1,
                without_summary: 1,
                kept: 3,
            }
        );
        assert_eq!(records[0].research_summary, "abstract-of-A1");
        assert_eq!(records[0].co_author_ids, vec!["A-shared"]);
    }

    #[tokio::test]
    async fn test_harvest_respects_per_topic_count() {
        let (records, report) = Harvester::new(source(), 1, 5)
            .harvest(&["genomics".to_string(), "robotics".to_string()])
            .await;
        assert_eq!(report.unique_authors, 2);
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_process_indexes_every_record() {
        let index = Arc::new(InMemoryVectorIndex::new());
        let processor = IndexProcessor::new(Arc::new(HashingEmbedder::new(32)), index.clone(), 2);
        let (records, _) = Harvester::new(source(), 10, 5)
            .harvest(&["genomics".to_string(), "robotics".to_string()])
            .await;

        assert_eq!(processor.process(&records).await.unwrap(), 3);
        assert_eq!(index.len().await, 3);

        // Re-indexing overwrites rather than duplicates
        assert_eq!(processor.process(&records).await.unwrap(), 3);
        assert_eq!(index.len().await, 3);
    }

    #[tokio::test]
    async fn test_written_store_loads_back() {
        let (records, _) = Harvester::new(source(), 10, 5)
            .harvest(&["genomics".to_string()])
            .await;
        let path = std::env::temp_dir()
            .join(format!("reviewer-finder-indexer-{}", std::process::id()))
            .join("authors.json");

        write_store(&path, &records).unwrap();
        let (store, report) = InMemoryAuthorStore::load_json(&path).unwrap();
        assert_eq!(report.loaded, records.len());
        assert_eq!(report.skipped, 0);
        assert_eq!(store.count(), 2);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
