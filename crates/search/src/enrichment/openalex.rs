//! OpenAlex author endpoint: ORCID and institution ROR page

use super::ContactSource;
use reviewer_finder_common::config::EnrichmentConfig;
use reviewer_finder_common::errors::{AppError, Result};
use reviewer_finder_common::models::{AuthorRecord, ContactInfo};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

const ORCID_PREFIX: &str = "https://orcid.org/";
const SELECT_FIELDS: &str = "id,display_name,last_known_institutions,orcid";

pub struct OpenAlexContactSource {
    client: reqwest::Client,
    base_url: String,
    mailto: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthorResponse {
    #[serde(default)]
    orcid: Option<String>,
    #[serde(default)]
    last_known_institutions: Option<Vec<Institution>>,
}

#[derive(Debug, Deserialize)]
struct Institution {
    #[serde(default)]
    ror: Option<String>,
}

impl AuthorResponse {
    fn into_contact(self) -> ContactInfo {
        let mut contact = ContactInfo::default();

        contact.institution_page = self
            .last_known_institutions
            .unwrap_or_default()
            .into_iter()
            .filter_map(|i| i.ror)
            .find(|ror| !ror.is_empty());

        if let Some(orcid) = self.orcid.filter(|o| !o.is_empty()) {
            let id = orcid.strip_prefix(ORCID_PREFIX).unwrap_or(&orcid).to_string();
            contact.orcid_url = Some(format!("{}{}", ORCID_PREFIX, id));
            contact.orcid = Some(id);
        }
        contact
    }
}

/// Map a non-success status to a retryable or final error
pub(super) fn status_error(source_name: &str, status: StatusCode) -> AppError {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        AppError::ServiceUnavailable {
            message: format!("{} returned {}", source_name, status),
        }
    } else {
        AppError::EnrichmentFailure {
            source_name: source_name.to_string(),
            message: format!("unexpected status {}", status),
        }
    }
}

impl OpenAlexContactSource {
    pub fn new(config: &EnrichmentConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.openalex_base.trim_end_matches('/').to_string(),
            mailto: config.mailto.clone().filter(|m| !m.is_empty()),
        })
    }
}

#[async_trait::async_trait]
impl ContactSource for OpenAlexContactSource {
    async fn lookup(&self, author: &AuthorRecord, _known: &ContactInfo) -> Result<ContactInfo> {
        let Some(key) = author.openalex_key() else {
            return Ok(ContactInfo::default());
        };

        let url = format!("{}/authors/{}", self.base_url, key);
        let mut request = self.client.get(&url).query(&[("select", SELECT_FIELDS)]);
        if let Some(mailto) = &self.mailto {
            request = request.query(&[("mailto", mailto.as_str())]);
        }

        let response = request.send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(ContactInfo::default()),
            status if status.is_success() => {
                let body: AuthorResponse = response.json().await?;
                Ok(body.into_contact())
            }
            status => Err(status_error(self.name(), status)),
        }
    }

    fn name(&self) -> &'static str {
        "openalex"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_orcid_and_ror() {
        let body: AuthorResponse = serde_json::from_str(
            r#"{
                "id": "https://openalex.org/A5023888391",
                "display_name": "Jane Smith",
                "orcid": "https://orcid.org/0000-0002-1825-0097",
                "last_known_institutions": [{"ror": ""}, {"ror": "https://ror.org/042nb2s44"}]
            }"#,
        )
        .unwrap();
        let contact = body.into_contact();
        assert_eq!(contact.orcid.as_deref(), Some("0000-0002-1825-0097"));
        assert_eq!(contact.orcid_url.as_deref(), Some("https://orcid.org/0000-0002-1825-0097"));
        assert_eq!(contact.institution_page.as_deref(), Some("https://ror.org/042nb2s44"));
        assert!(contact.email.is_none());
    }

    #[test]
    fn test_handles_null_fields() {
        let body: AuthorResponse =
            serde_json::from_str(r#"{"orcid": null, "last_known_institutions": null}"#).unwrap();
        assert_eq!(body.into_contact(), ContactInfo::default());
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            status_error("openalex", StatusCode::SERVICE_UNAVAILABLE),
            AppError::ServiceUnavailable { .. }
        ));
        assert!(matches!(
            status_error("openalex", StatusCode::TOO_MANY_REQUESTS),
            AppError::ServiceUnavailable { .. }
        ));
        assert!(matches!(
            status_error("openalex", StatusCode::BAD_REQUEST),
            AppError::EnrichmentFailure { .. }
        ));
    }

    #[tokio::test]
    async fn test_non_openalex_ids_are_skipped() {
        let source = OpenAlexContactSource::new(&EnrichmentConfig::default()).unwrap();
        let contact = source
            .lookup(&AuthorRecord::new("local-7", "Ada"), &ContactInfo::default())
            .await
            .unwrap();
        assert_eq!(contact, ContactInfo::default());
    }
}
