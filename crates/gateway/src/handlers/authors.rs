//! Author lookup handler

use axum::{
    extract::{Path, State},
    Json,
};

use crate::AppState;
use reviewer_finder_common::{
    errors::{AppError, Result},
    models::{AuthorRecord, OPENALEX_PREFIX},
};

/// Fetch one author record; short OpenAlex keys resolve to their full ids
pub async fn get_author(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<AuthorRecord>> {
    let store = state.finder.store();

    if let Some(record) = store.get(&id).await? {
        return Ok(Json(record));
    }

    let full_id = format!("{}{}", OPENALEX_PREFIX, id);
    store
        .get(&full_id)
        .await?
        .map(Json)
        .ok_or(AppError::AuthorNotFound { id })
}
