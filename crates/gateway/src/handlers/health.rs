//! Health check handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::time::Instant;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub vector_index: CheckResult,
    pub candidate_store: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    fn up(start: Instant) -> Self {
        Self {
            status: "up".to_string(),
            latency_ms: Some(start.elapsed().as_millis() as u64),
            records: None,
            error: None,
        }
    }

    fn down(error: impl ToString) -> Self {
        Self {
            status: "down".to_string(),
            latency_ms: None,
            records: None,
            error: Some(error.to_string()),
        }
    }

    fn is_up(&self) -> bool {
        self.status == "up"
    }
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: reviewer_finder_common::VERSION.to_string(),
    })
}

/// Readiness probe - vector index reachable and author store loaded
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let start = Instant::now();
    let vector_index = match state.finder.index().ping().await {
        Ok(()) => CheckResult::up(start),
        Err(e) => CheckResult::down(e),
    };

    let start = Instant::now();
    let candidate_store = match state.finder.store().len().await {
        Ok(0) => CheckResult::down("no author records loaded"),
        Ok(records) => CheckResult {
            records: Some(records),
            ..CheckResult::up(start)
        },
        Err(e) => CheckResult::down(e),
    };

    let all_healthy = vector_index.is_up() && candidate_store.is_up();
    let status = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadyResponse {
            status: if all_healthy { "ready" } else { "not_ready" }.to_string(),
            checks: HealthChecks {
                vector_index,
                candidate_store,
            },
        }),
    )
}
