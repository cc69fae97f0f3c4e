//! Candidate store: author records keyed by identifier
//!
//! The store is the source of truth for author profiles. The vector index only
//! carries ids and a works-count payload; every hit is hydrated from here.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

use crate::errors::{AppError, Result};
use crate::models::AuthorRecord;

/// Read access to author records
#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Record for an id, `None` when unknown
    async fn get(&self, author_id: &str) -> Result<Option<AuthorRecord>>;

    /// Records whose name equals `name`, ignoring case and surrounding whitespace
    async fn find_by_name(&self, name: &str) -> Result<Vec<AuthorRecord>>;

    /// Records with at least `min_works` works, in id order
    async fn filter_by_min_works(&self, min_works: u32) -> Result<Vec<AuthorRecord>>;

    /// Number of records held
    async fn len(&self) -> Result<usize>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

/// Outcome of loading a batch of raw records
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: usize,
}

/// Immutable in-memory store, loaded once at startup
#[derive(Debug, Default, Clone)]
pub struct InMemoryAuthorStore {
    records: HashMap<String, AuthorRecord>,
    by_name: HashMap<String, Vec<String>>,
}

fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl InMemoryAuthorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from typed records; invalid ones are skipped
    pub fn from_records(records: impl IntoIterator<Item = AuthorRecord>) -> Self {
        let mut store = Self::new();
        for record in records {
            if let Err(e) = store.insert(record) {
                tracing::warn!(error = %e, "Skipping author record");
            }
        }
        store
    }

    /// Parse a JSON array of author records, skipping malformed entries
    pub fn from_json_str(json: &str) -> Result<(Self, LoadReport)> {
        let raw: Vec<serde_json::Value> = serde_json::from_str(json)?;
        let mut store = Self::new();
        let mut report = LoadReport::default();

        for (position, value) in raw.into_iter().enumerate() {
            let inserted = serde_json::from_value::<AuthorRecord>(value)
                .map_err(AppError::from)
                .and_then(|record| store.insert(record));

            match inserted {
                Ok(()) => report.loaded += 1,
                Err(e) => {
                    report.skipped += 1;
                    tracing::warn!(position, error = %e, "Skipping malformed author record");
                }
            }
        }

        Ok((store, report))
    }

    /// Load the JSON file written by the indexer
    pub fn load_json(path: impl AsRef<Path>) -> Result<(Self, LoadReport)> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| AppError::Store {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        let (store, report) = Self::from_json_str(&json)?;

        tracing::info!(
            path = %path.display(),
            loaded = report.loaded,
            skipped = report.skipped,
            "Author store loaded"
        );
        Ok((store, report))
    }

    /// Validate and add a record, replacing any record with the same id
    pub fn insert(&mut self, record: AuthorRecord) -> Result<()> {
        record.validate()?;
        let record = record.bounded();

        if let Some(previous) = self.records.get(&record.id) {
            let key = name_key(&previous.name);
            if let Some(ids) = self.by_name.get_mut(&key) {
                ids.retain(|id| *id != record.id);
            }
        }

        self.by_name
            .entry(name_key(&record.name))
            .or_default()
            .push(record.id.clone());
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }
}

#[async_trait]
impl CandidateStore for InMemoryAuthorStore {
    async fn get(&self, author_id: &str) -> Result<Option<AuthorRecord>> {
        Ok(self.records.get(author_id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Vec<AuthorRecord>> {
        let key = name_key(name);
        if key.is_empty() {
            return Ok(Vec::new());
        }
        let mut found: Vec<AuthorRecord> = self
            .by_name
            .get(&key)
            .into_iter()
            .flatten()
            .filter_map(|id| self.records.get(id).cloned())
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }

    async fn filter_by_min_works(&self, min_works: u32) -> Result<Vec<AuthorRecord>> {
        let mut found: Vec<AuthorRecord> = self
            .records
            .values()
            .filter(|r| r.works_count >= min_works)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.records.len())
    }
}
