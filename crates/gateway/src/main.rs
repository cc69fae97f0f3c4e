//! ReviewerFinder API Gateway
//!
//! HTTP entry point for reviewer search.
//! Handles:
//! - Request validation and routing
//! - Rate limiting
//! - Observability (logging, metrics)

mod handlers;
mod middleware;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use reviewer_finder_common::{
    config::{AppConfig, ObservabilityConfig, StoreConfig},
    metrics, CandidateStore, InMemoryAuthorStore,
};
use reviewer_finder_search::{index_authors, ReviewerFinder};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::middleware::rate_limit::{self, RateLimitState};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub finder: Arc<ReviewerFinder>,
    pub metrics: Option<PrometheusHandle>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.observability);

    info!("Starting ReviewerFinder API Gateway v{}", reviewer_finder_common::VERSION);

    config.validate()?;
    let config = Arc::new(config);

    let metrics_handle = install_metrics_recorder()?;
    metrics::register_metrics();

    let store = load_store(&config.store)?;
    let finder = ReviewerFinder::from_config(&config, store.clone())?;

    // The in-memory index starts empty; fill it from the store
    if finder.index().backend() == "memory" {
        let indexed = warm_index(&finder, store.as_ref(), &config).await?;
        info!(indexed, "In-memory vector index built from author store");
    } else if let Err(e) = finder.index().ping().await {
        warn!(error = %e, "Vector index not reachable at startup");
    }

    let state = AppState {
        config: config.clone(),
        finder: Arc::new(finder),
        metrics: Some(metrics_handle),
    };

    let app = create_router(state)?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
    }
}

fn install_metrics_recorder() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("embedding_duration_seconds".to_string()),
            metrics::EMBEDDING_BUCKETS,
        )?
        .set_buckets_for_metric(Matcher::Suffix("duration_seconds".to_string()), metrics::LATENCY_BUCKETS)?
        .install_recorder()?;
    Ok(handle)
}

/// A missing store file starts the gateway with no candidates
fn load_store(config: &StoreConfig) -> anyhow::Result<Arc<InMemoryAuthorStore>> {
    if !Path::new(&config.authors_path).exists() {
        warn!(path = %config.authors_path, "Author store file not found, starting empty");
        return Ok(Arc::new(InMemoryAuthorStore::new()));
    }
    let (store, _report) = InMemoryAuthorStore::load_json(&config.authors_path)?;
    Ok(Arc::new(store))
}

/// Embed every searchable author from the store into the finder's index
async fn warm_index(finder: &ReviewerFinder, store: &dyn CandidateStore, config: &AppConfig) -> anyhow::Result<usize> {
    let records = store.filter_by_min_works(config.search.min_works_count).await?;
    let indexed = index_authors(
        finder.embedder().as_ref(),
        finder.index().as_ref(),
        &records,
        config.embedding.batch_size,
    )
    .await?;
    Ok(indexed)
}

/// Create the main application router
fn create_router(state: AppState) -> anyhow::Result<Router> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let mut api_routes = Router::new()
        .route("/reviewers/search", post(handlers::reviewers::search_reviewers))
        .route("/authors/{id}", get(handlers::authors::get_author));

    if state.config.rate_limit.enabled {
        let limiter = RateLimitState::new(&state.config.rate_limit)?;
        api_routes = api_routes.layer(axum::middleware::from_fn_with_state(limiter, rate_limit::rate_limit));
    }

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/metrics", get(handlers::metrics))
        .nest("/v1", api_routes)
        .layer(axum::middleware::from_fn(middleware::track_metrics))
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(ConcurrencyLimitLayer::new(state.config.server.max_concurrent_requests.max(1)))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state);

    Ok(app)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
