//! ORCID public API: email and researcher URLs

use super::openalex::status_error;
use super::ContactSource;
use reviewer_finder_common::config::EnrichmentConfig;
use reviewer_finder_common::errors::Result;
use reviewer_finder_common::models::{AuthorRecord, ContactInfo};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

pub struct OrcidContactSource {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Default, Deserialize)]
struct PersonResponse {
    #[serde(default)]
    emails: Option<Emails>,
    #[serde(default, rename = "researcher-urls")]
    researcher_urls: Option<ResearcherUrls>,
}

#[derive(Debug, Default, Deserialize)]
struct Emails {
    #[serde(default)]
    email: Vec<EmailEntry>,
}

#[derive(Debug, Deserialize)]
struct EmailEntry {
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ResearcherUrls {
    #[serde(default, rename = "researcher-url")]
    researcher_url: Vec<UrlEntry>,
}

#[derive(Debug, Deserialize)]
struct UrlEntry {
    #[serde(default, rename = "url-name")]
    url_name: Option<String>,
    #[serde(default)]
    url: Option<UrlValue>,
}

#[derive(Debug, Deserialize)]
struct UrlValue {
    #[serde(default)]
    value: Option<String>,
}

impl PersonResponse {
    fn into_contact(self) -> ContactInfo {
        let mut contact = ContactInfo {
            email: self
                .emails
                .unwrap_or_default()
                .email
                .into_iter()
                .filter_map(|e| e.email)
                .find(|e| !e.is_empty()),
            ..Default::default()
        };

        let urls = self.researcher_urls.unwrap_or_default().researcher_url;
        for entry in urls {
            let Some(value) = entry.url.and_then(|u| u.value).filter(|v| !v.is_empty()) else {
                continue;
            };
            let label = entry.url_name.unwrap_or_default().to_lowercase();

            if label.contains("google scholar") || value.contains("scholar.google") {
                contact.google_scholar = Some(value);
            } else if label.contains("homepage") || label.contains("personal") || contact.homepage.is_none() {
                contact.homepage = Some(value);
            }
        }
        contact
    }
}

impl OrcidContactSource {
    pub fn new(config: &EnrichmentConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.orcid_base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait::async_trait]
impl ContactSource for OrcidContactSource {
    async fn lookup(&self, _author: &AuthorRecord, known: &ContactInfo) -> Result<ContactInfo> {
        let Some(orcid) = known.orcid.as_deref().filter(|o| !o.is_empty()) else {
            return Ok(ContactInfo::default());
        };

        let url = format!("{}/{}/person", self.base_url, orcid);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(ContactInfo::default()),
            status if status.is_success() => {
                let body: PersonResponse = response.json().await?;
                Ok(body.into_contact())
            }
            status => Err(status_error(self.name(), status)),
        }
    }

    fn name(&self) -> &'static str {
        "orcid"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_email_and_urls() {
        let body: PersonResponse = serde_json::from_str(
            r#"{
                "emails": {"email": [{"email": null}, {"email": "jane@mit.edu"}, {"email": "j@x.org"}]},
                "researcher-urls": {"researcher-url": [
                    {"url-name": "Lab", "url": {"value": "https://lab.mit.edu"}},
                    {"url-name": "Google Scholar", "url": {"value": "https://scholar.google.com/citations?user=x"}},
                    {"url-name": "Personal homepage", "url": {"value": "https://jane.dev"}}
                ]}
            }"#,
        )
        .unwrap();
        let contact = body.into_contact();
        assert_eq!(contact.email.as_deref(), Some("jane@mit.edu"));
        assert_eq!(
            contact.google_scholar.as_deref(),
            Some("https://scholar.google.com/citations?user=x")
        );
        assert_eq!(contact.homepage.as_deref(), Some("https://jane.dev"));
    }

    #[test]
    fn test_first_unlabelled_url_becomes_homepage() {
        let body: PersonResponse = serde_json::from_str(
            r#"{"researcher-urls": {"researcher-url": [
                {"url-name": null, "url": {"value": "https://a.org"}},
                {"url-name": "Blog", "url": {"value": "https://b.org"}}
            ]}}"#,
        )
        .unwrap();
        assert_eq!(body.into_contact().homepage.as_deref(), Some("https://a.org"));
    }

    #[test]
    fn test_empty_person_record() {
        let body: PersonResponse = serde_json::from_str(r#"{"emails": null}"#).unwrap();
        assert_eq!(body.into_contact(), ContactInfo::default());
    }

    #[tokio::test]
    async fn test_without_orcid_no_request_is_made() {
        let source = OrcidContactSource::new(&EnrichmentConfig::default()).unwrap();
        let contact = source
            .lookup(&AuthorRecord::new("A1", "Ada"), &ContactInfo::default())
            .await
            .unwrap();
        assert_eq!(contact, ContactInfo::default());
    }
}
