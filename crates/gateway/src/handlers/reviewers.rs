//! Reviewer search handler

use axum::{extract::State, Json};
use serde::Deserialize;
use validator::Validate;

use crate::AppState;
use reviewer_finder_common::{
    errors::{AppError, Result},
    models::{ManuscriptQuery, RankedResult},
};
use reviewer_finder_search::SearchOptions;

/// Reviewer search request
#[derive(Debug, Deserialize, Validate)]
pub struct ReviewerSearchRequest {
    #[validate(length(min = 1, max = 1000))]
    pub title: String,

    #[serde(rename = "abstract")]
    #[validate(length(min = 1, max = 20000))]
    pub abstract_text: String,

    #[serde(default)]
    #[validate(length(max = 50))]
    pub keywords: Vec<String>,

    /// Declared manuscript authors, for conflict checks
    #[serde(default)]
    #[validate(length(max = 100))]
    pub author_names: Vec<String>,

    #[serde(default)]
    #[validate(length(max = 100))]
    pub author_institutions: Vec<String>,

    /// Store ids of declared authors, when known
    #[serde(default)]
    #[validate(length(max = 100))]
    pub author_ids: Vec<String>,

    /// Candidates retrieved before scoring; configured default when absent
    pub search_depth: Option<usize>,

    /// Reviewers returned; configured default when absent
    pub reviewer_count: Option<usize>,
}

impl ReviewerSearchRequest {
    fn into_query(self) -> ManuscriptQuery {
        ManuscriptQuery::new(self.title, self.abstract_text, self.keywords)
            .with_authors(self.author_names)
            .with_institutions(self.author_institutions)
            .with_author_ids(self.author_ids)
    }
}

/// Rank reviewers for a manuscript
pub async fn search_reviewers(
    State(state): State<AppState>,
    Json(request): Json<ReviewerSearchRequest>,
) -> Result<Json<RankedResult>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let options = SearchOptions::resolve(
        state.finder.search_config(),
        request.search_depth,
        request.reviewer_count,
    );
    let query = request.into_query();

    let result = state.finder.find_reviewers(&query, options).await?;
    Ok(Json(result))
}
