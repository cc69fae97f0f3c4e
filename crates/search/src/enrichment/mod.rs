//! Contact enrichment for ranked reviewers
//!
//! Runs after ranking and COI detection. Each reviewer keeps the contact
//! fields already in its store record; external sources are consulted in
//! order only while no email is known. Every lookup has its own timeout and
//! retry budget, and a failed lookup only costs that reviewer's extra fields.

mod openalex;
mod orcid;

pub use openalex::OpenAlexContactSource;
pub use orcid::OrcidContactSource;

use backoff::ExponentialBackoffBuilder;
use futures::stream::{self, StreamExt};
use reviewer_finder_common::config::EnrichmentConfig;
use reviewer_finder_common::errors::{AppError, Result};
use reviewer_finder_common::metrics;
use reviewer_finder_common::models::{AuthorRecord, ContactInfo, OPENALEX_PREFIX};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_INITIAL_RETRY_INTERVAL: Duration = Duration::from_millis(200);

/// An external source of contact details
#[async_trait::async_trait]
pub trait ContactSource: Send + Sync {
    /// Contact fields this source knows for `author`; empty when it knows nothing
    async fn lookup(&self, author: &AuthorRecord, known: &ContactInfo) -> Result<ContactInfo>;

    fn name(&self) -> &'static str;
}

/// Errors worth another attempt
fn is_transient(error: &AppError) -> bool {
    matches!(
        error,
        AppError::HttpClient(_) | AppError::ServiceUnavailable { .. } | AppError::RateLimited { .. }
    )
}

pub struct ContactEnricher {
    sources: Vec<Arc<dyn ContactSource>>,
    timeout: Duration,
    retry_budget: Duration,
    initial_retry_interval: Duration,
    max_concurrent: usize,
}

impl ContactEnricher {
    pub fn new(sources: Vec<Arc<dyn ContactSource>>, timeout: Duration, retry_budget: Duration, max_concurrent: usize) -> Self {
        Self {
            sources,
            timeout,
            retry_budget,
            initial_retry_interval: DEFAULT_INITIAL_RETRY_INTERVAL,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn with_initial_retry_interval(mut self, interval: Duration) -> Self {
        self.initial_retry_interval = interval;
        self
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// OpenAlex then ORCID, as configured; no sources when disabled
    pub fn from_config(config: &EnrichmentConfig) -> Result<Self> {
        let sources: Vec<Arc<dyn ContactSource>> = if config.enabled {
            vec![
                Arc::new(OpenAlexContactSource::new(config)?),
                Arc::new(OrcidContactSource::new(config)?),
            ]
        } else {
            Vec::new()
        };

        Ok(Self::new(
            sources,
            Duration::from_secs(config.timeout_secs),
            Duration::from_secs(config.retry_budget_secs),
            config.max_concurrent,
        ))
    }

    /// Enrich every author concurrently, preserving order
    pub async fn enrich_all(&self, authors: Vec<AuthorRecord>) -> Vec<AuthorRecord> {
        stream::iter(authors)
            .map(|author| self.enrich(author))
            .buffered(self.max_concurrent)
            .collect()
            .await
    }

    /// Fill missing contact fields of one author; never fails
    pub async fn enrich(&self, mut author: AuthorRecord) -> AuthorRecord {
        for source in &self.sources {
            if author.contact.has_email() {
                break;
            }
            match self.lookup_with_retry(source.as_ref(), &author).await {
                Ok(found) => {
                    metrics::record_enrichment(source.name(), true);
                    author.contact.merge_missing(found);
                }
                Err(e) => {
                    metrics::record_enrichment(source.name(), false);
                    tracing::warn!(
                        author_id = %author.id,
                        source = source.name(),
                        error = %e,
                        "Contact lookup failed"
                    );
                }
            }
        }

        if let Some(key) = author.openalex_key() {
            author.contact.openalex_url = Some(format!("{}{}", OPENALEX_PREFIX, key));
        }
        author
    }

    async fn lookup_with_retry(&self, source: &dyn ContactSource, author: &AuthorRecord) -> Result<ContactInfo> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_retry_interval)
            .with_max_elapsed_time(Some(self.retry_budget))
            .build();

        backoff::future::retry(policy, move || async move {
            let attempt = tokio::time::timeout(self.timeout, source.lookup(author, &author.contact)).await;
            match attempt {
                Ok(Ok(contact)) => Ok(contact),
                Ok(Err(e)) if is_transient(&e) => Err(backoff::Error::transient(e)),
                Ok(Err(e)) => Err(backoff::Error::permanent(e)),
                Err(_) => Err(backoff::Error::transient(AppError::ServiceUnavailable {
                    message: format!("{} lookup timed out after {:?}", source.name(), self.timeout),
                })),
            }
        })
        .await
    }
}
