//! OpenAlex harvesting
//!
//! Authors are found per seed topic (cursor paging, most cited first), then
//! a few recent works per author supply abstracts, co-authors and the last
//! publication date.

use backoff::ExponentialBackoffBuilder;
use chrono::NaiveDate;
use reqwest::StatusCode;
use reviewer_finder_common::config::AppConfig;
use reviewer_finder_common::models::{AuthorRecord, ContactInfo, MAX_CO_AUTHORS, MAX_TOPICS, OPENALEX_PREFIX};
use reviewer_finder_common::text::truncate_chars;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::debug;

use crate::errors::{IndexerError, Result};

/// Longest research summary kept per author
pub const MAX_SUMMARY_CHARS: usize = 5000;

/// Abstracts concatenated into a summary
const MAX_SUMMARY_ABSTRACTS: usize = 10;

/// OpenAlex page size limit used here
const MAX_PER_PAGE: usize = 50;

const ORCID_PREFIX: &str = "https://orcid.org/";

const AUTHOR_FIELDS: &str =
    "id,display_name,orcid,last_known_institutions,topics,summary_stats,works_count,cited_by_count";
const WORK_FIELDS: &str = "id,title,abstract_inverted_index,publication_date,authorships";

const RETRY_BUDGET: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAuthor {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub orcid: Option<String>,
    #[serde(default)]
    pub last_known_institutions: Option<Vec<RawInstitution>>,
    #[serde(default)]
    pub topics: Option<Vec<RawTopic>>,
    #[serde(default)]
    pub summary_stats: Option<SummaryStats>,
    #[serde(default)]
    pub works_count: Option<u32>,
    #[serde(default)]
    pub cited_by_count: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawInstitution {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub ror: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTopic {
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryStats {
    #[serde(default)]
    pub h_index: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawWork {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub abstract_inverted_index: Option<HashMap<String, Vec<usize>>>,
    #[serde(default)]
    pub publication_date: Option<String>,
    #[serde(default)]
    pub authorships: Option<Vec<Authorship>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Authorship {
    #[serde(default)]
    pub author: Option<AuthorRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorRef {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
    #[serde(default)]
    meta: Option<PageMeta>,
}

#[derive(Debug, Deserialize)]
struct PageMeta {
    #[serde(default)]
    next_cursor: Option<String>,
}

/// Where raw author and work records come from
#[async_trait::async_trait]
pub trait AuthorSource: Send + Sync {
    /// Up to `count` authors matching `topic`, most cited first
    async fn authors_by_topic(&self, topic: &str, count: usize) -> Result<Vec<RawAuthor>>;

    /// Up to `limit` works of one author, newest first
    async fn recent_works(&self, author_id: &str, limit: usize) -> Result<Vec<RawWork>>;
}

pub struct OpenAlexClient {
    client: reqwest::Client,
    base_url: String,
    mailto: Option<String>,
    request_delay: Duration,
}

impl OpenAlexClient {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.enrichment.timeout_secs.max(30)))
            .build()?;

        Ok(Self {
            client,
            base_url: config.enrichment.openalex_base.trim_end_matches('/').to_string(),
            mailto: config.enrichment.mailto.clone().filter(|m| !m.is_empty()),
            request_delay: Duration::from_millis(config.ingestion.request_delay_ms),
        })
    }

    fn with_mailto(&self, mut query: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        if let Some(mailto) = &self.mailto {
            query.push(("mailto", mailto.clone()));
        }
        query
    }

    /// GET with retries on rate limiting, server errors and transport failures
    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&'static str, String)]) -> Result<T> {
        let policy = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(RETRY_BUDGET))
            .build();

        backoff::future::retry(policy, move || async move {
            let response = self
                .client
                .get(url)
                .query(query)
                .send()
                .await
                .map_err(|e| backoff::Error::transient(IndexerError::Http(e)))?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                return Err(backoff::Error::transient(IndexerError::OpenAlex(format!(
                    "{} returned {}",
                    url, status
                ))));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(IndexerError::OpenAlex(format!(
                    "{} returned {}",
                    url, status
                ))));
            }

            response
                .json::<T>()
                .await
                .map_err(|e| backoff::Error::permanent(IndexerError::Http(e)))
        })
        .await
    }
}

#[async_trait::async_trait]
impl AuthorSource for OpenAlexClient {
    async fn authors_by_topic(&self, topic: &str, count: usize) -> Result<Vec<RawAuthor>> {
        let url = format!("{}/authors", self.base_url);
        let per_page = count.clamp(1, MAX_PER_PAGE);
        let mut authors = Vec::with_capacity(count);
        let mut cursor = "*".to_string();

        while authors.len() < count {
            let query = self.with_mailto(vec![
                ("filter", format!("default.search:{}", topic)),
                ("sort", "cited_by_count:desc".to_string()),
                ("per_page", per_page.to_string()),
                ("select", AUTHOR_FIELDS.to_string()),
                ("cursor", cursor.clone()),
            ]);

            let page: Page<RawAuthor> = self.get_json(&url, &query).await?;
            if page.results.is_empty() {
                break;
            }
            authors.extend(page.results);
            debug!(topic, fetched = authors.len(), "Fetched author page");

            match page.meta.and_then(|m| m.next_cursor) {
                Some(next) => cursor = next,
                None => break,
            }
            tokio::time::sleep(self.request_delay).await;
        }

        authors.truncate(count);
        Ok(authors)
    }

    async fn recent_works(&self, author_id: &str, limit: usize) -> Result<Vec<RawWork>> {
        let key = author_id.strip_prefix(OPENALEX_PREFIX).unwrap_or(author_id);
        let url = format!("{}/works", self.base_url);
        let query = self.with_mailto(vec![
            ("filter", format!("author.id:{}", key)),
            ("sort", "publication_date:desc".to_string()),
            ("per_page", limit.clamp(1, MAX_PER_PAGE).to_string()),
            ("select", WORK_FIELDS.to_string()),
        ]);

        let page: Page<RawWork> = self.get_json(&url, &query).await?;
        Ok(page.results)
    }
}

/// Rebuild plain text from OpenAlex's word -> positions abstract encoding
pub fn reconstruct_abstract(inverted_index: &HashMap<String, Vec<usize>>) -> String {
    let mut positioned: Vec<(usize, &str)> = inverted_index
        .iter()
        .flat_map(|(word, positions)| positions.iter().map(move |p| (*p, word.as_str())))
        .collect();
    positioned.sort_unstable();
    positioned.into_iter().map(|(_, w)| w).collect::<Vec<_>>().join(" ")
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Build a store record from an OpenAlex author and their recent works
pub fn build_profile(raw: RawAuthor, works: &[RawWork]) -> AuthorRecord {
    let institutions = raw.last_known_institutions.unwrap_or_default();
    let primary = institutions.first().cloned().unwrap_or_default();

    let topics: Vec<String> = raw
        .topics
        .unwrap_or_default()
        .into_iter()
        .filter_map(|t| non_empty(t.display_name))
        .take(MAX_TOPICS)
        .collect();

    let mut abstracts = Vec::new();
    let mut last_publication: Option<NaiveDate> = None;
    let mut seen = HashSet::new();
    let mut co_author_ids = Vec::new();

    for work in works {
        if let Some(index) = &work.abstract_inverted_index {
            let text = reconstruct_abstract(index);
            if !text.is_empty() {
                abstracts.push(text);
            }
        }

        let date = work
            .publication_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
        last_publication = last_publication.max(date);

        for authorship in work.authorships.iter().flatten() {
            let Some(id) = authorship.author.as_ref().and_then(|a| a.id.clone()) else {
                continue;
            };
            if !id.is_empty() && id != raw.id && seen.insert(id.clone()) {
                co_author_ids.push(id);
            }
        }
    }
    co_author_ids.truncate(MAX_CO_AUTHORS);

    let summary = abstracts
        .iter()
        .take(MAX_SUMMARY_ABSTRACTS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");

    let mut contact = ContactInfo {
        institution_page: non_empty(primary.ror.clone()),
        ..Default::default()
    };
    if let Some(orcid) = non_empty(raw.orcid) {
        let id = orcid.strip_prefix(ORCID_PREFIX).unwrap_or(&orcid).to_string();
        contact.orcid_url = Some(format!("{}{}", ORCID_PREFIX, id));
        contact.orcid = Some(id);
    }

    let mut record = AuthorRecord::new(
        raw.id,
        non_empty(raw.display_name).unwrap_or_else(|| "Unknown".to_string()),
    );
    record.institution = non_empty(primary.display_name).unwrap_or_default();
    record.country = non_empty(primary.country_code).unwrap_or_default();
    record.topics = topics;
    record.h_index = raw.summary_stats.and_then(|s| s.h_index).unwrap_or(0);
    record.citation_count = raw.cited_by_count.unwrap_or(0);
    record.works_count = raw.works_count.unwrap_or(0);
    record.last_publication_date = last_publication;
    record.co_author_ids = co_author_ids;
    record.contact = contact;
    record.research_summary = truncate_chars(&summary, MAX_SUMMARY_CHARS).to_string();
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_author() -> RawAuthor {
        serde_json::from_str(
            r#"{
                "id": "https://openalex.org/A100",
                "display_name": "Jane Smith",
                "orcid": "https://orcid.org/0000-0001-2345-6789",
                "last_known_institutions": [
                    {"display_name": "MIT", "country_code": "US", "ror": "https://ror.org/042nb2s44"},
                    {"display_name": "Harvard", "country_code": "US", "ror": null}
                ],
                "topics": [{"display_name": "Seismology"}, {"display_name": ""}, {"display_name": "Inverse problems"}],
                "summary_stats": {"h_index": 41, "i10_index": 90},
                "works_count": 120,
                "cited_by_count": 9000
            }"#,
        )
        .unwrap()
    }

    fn works() -> Vec<RawWork> {
        serde_json::from_str(
            r#"[
                {
                    "id": "https://openalex.org/W2",
                    "abstract_inverted_index": {"waves": [1], "Seismic": [0], "propagate": [2]},
                    "publication_date": "2024-11-02",
                    "authorships": [
                        {"author": {"id": "https://openalex.org/A100"}},
                        {"author": {"id": "https://openalex.org/A200"}}
                    ]
                },
                {
                    "id": "https://openalex.org/W1",
                    "abstract_inverted_index": null,
                    "publication_date": "2023-01-15",
                    "authorships": [
                        {"author": {"id": "https://openalex.org/A200"}},
                        {"author": {"id": "https://openalex.org/A300"}},
                        {"author": null}
                    ]
                }
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_reconstruct_abstract_orders_by_position() {
        let mut index = HashMap::new();
        index.insert("the".to_string(), vec![0, 3]);
        index.insert("cat".to_string(), vec![1]);
        index.insert("saw".to_string(), vec![2]);
        index.insert("dog".to_string(), vec![4]);
        assert_eq!(reconstruct_abstract(&index), "the cat saw the dog");
        assert_eq!(reconstruct_abstract(&HashMap::new()), "");
    }

    #[test]
    fn test_build_profile() {
        let record = build_profile(raw_author(), &works());

        assert_eq!(record.id, "https://openalex.org/A100");
        assert_eq!(record.name, "Jane Smith");
        assert_eq!(record.institution, "MIT");
        assert_eq!(record.country, "US");
        assert_eq!(record.topics, vec!["Seismology", "Inverse problems"]);
        assert_eq!(record.h_index, 41);
        assert_eq!(record.works_count, 120);
        assert_eq!(record.citation_count, 9000);
        assert_eq!(record.last_publication_date, NaiveDate::from_ymd_opt(2024, 11, 2));
        assert_eq!(
            record.co_author_ids,
            vec!["https://openalex.org/A200", "https://openalex.org/A300"]
        );
        assert_eq!(record.research_summary, "Seismic waves propagate");
        assert_eq!(record.contact.orcid.as_deref(), Some("0000-0001-2345-6789"));
        assert_eq!(record.contact.institution_page.as_deref(), Some("https://ror.org/042nb2s44"));
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_build_profile_limits() {
        let mut raw = raw_author();
        raw.topics = Some(
            (0..30)
                .map(|i| RawTopic {
                    display_name: Some(format!("Topic {}", i)),
                })
                .collect(),
        );
        let long_word = "x".repeat(1000);
        let works: Vec<RawWork> = (0..70)
            .map(|i| {
                let mut index = HashMap::new();
                index.insert(long_word.clone(), vec![0]);
                RawWork {
                    id: format!("W{}", i),
                    abstract_inverted_index: Some(index),
                    publication_date: Some("not a date".into()),
                    authorships: Some(vec![Authorship {
                        author: Some(AuthorRef {
                            id: Some(format!("https://openalex.org/A{}", 1000 + i)),
                        }),
                    }]),
                }
            })
            .collect();

        let record = build_profile(raw, &works);
        assert_eq!(record.topics.len(), MAX_TOPICS);
        assert_eq!(record.co_author_ids.len(), MAX_CO_AUTHORS);
        assert_eq!(record.research_summary.chars().count(), MAX_SUMMARY_CHARS);
        assert!(record.last_publication_date.is_none());
    }

    #[test]
    fn test_sparse_author() {
        let raw: RawAuthor = serde_json::from_str(r#"{"id": "https://openalex.org/A7", "display_name": null}"#).unwrap();
        let record = build_profile(raw, &[]);
        assert_eq!(record.name, "Unknown");
        assert!(record.research_summary.is_empty());
        assert!(record.contact.orcid.is_none());
        assert_eq!(record.works_count, 0);
    }

    #[test]
    fn test_page_without_meta() {
        let page: Page<RawWork> = serde_json::from_str(r#"{"results": [{"id": "W1"}]}"#).unwrap();
        assert_eq!(page.results.len(), 1);
        assert!(page.meta.is_none());
    }
}
