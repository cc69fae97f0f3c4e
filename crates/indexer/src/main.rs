//! ReviewerFinder Indexer
//!
//! Builds the candidate pool offline:
//! 1. Fetches authors per seed topic from OpenAlex
//! 2. Builds author profiles from their recent works
//! 3. Writes the author store JSON read by the gateway
//! 4. Embeds every author and upserts the vectors
//!
//! Usage:
//!   indexer fetch            harvest, write the store, then index it
//!   indexer index [PATH]     index an existing store file
//!   indexer check            ping the vector index

mod errors;
mod openalex;
mod processor;

use clap::{Parser, Subcommand};
use reviewer_finder_common::{
    config::AppConfig,
    embeddings::create_embedder,
    models::AuthorRecord,
    CandidateStore, InMemoryAuthorStore, VERSION,
};
use reviewer_finder_search::create_vector_index;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::errors::Result;
use crate::openalex::OpenAlexClient;
use crate::processor::{write_store, Harvester, IndexProcessor};

/// Offline author harvesting and indexing
#[derive(Debug, Parser)]
#[command(name = "indexer", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
enum Command {
    /// Harvest authors from OpenAlex, write the store, then index it
    Fetch,
    /// Index an existing author store file
    Index {
        /// Store file (default: the configured authors path)
        path: Option<String>,
    },
    /// Ping the vector index
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level)),
        )
        .with_target(true)
        .json()
        .init();

    info!("Starting ReviewerFinder Indexer v{}", VERSION);
    config.validate()?;

    if let Err(e) = run(cli.command, &config).await {
        error!(error = %e, "Indexer failed");
        return Err(e.into());
    }
    Ok(())
}

async fn run(command: Command, config: &AppConfig) -> Result<()> {
    let index = create_vector_index(&config.vector_index)?;

    if command == Command::Check {
        index.ping().await?;
        info!(backend = index.backend(), "Vector index reachable");
        return Ok(());
    }

    if index.backend() == "memory" {
        warn!("Indexing into the in-memory backend; vectors are discarded on exit");
    }

    let embedder = create_embedder(&config.embedding)?;
    info!(
        model = %embedder.model_name(),
        dimension = embedder.dimension(),
        "Embedder initialized"
    );
    let processor = IndexProcessor::new(embedder, index, config.embedding.batch_size);

    let records = match command {
        Command::Fetch => {
            let client = OpenAlexClient::from_config(config)?;
            let harvester = Harvester::new(
                Arc::new(client),
                config.ingestion.authors_per_topic,
                config.ingestion.works_per_author,
            )
            .with_delay(Duration::from_millis(config.ingestion.request_delay_ms / 2));

            let (records, _report) = harvester.harvest(&config.ingestion.seed_topics).await;
            write_store(&config.store.authors_path, &records)?;
            records
        }
        Command::Index { path } => {
            let path = path.unwrap_or_else(|| config.store.authors_path.clone());
            load_records(&path, config.search.min_works_count).await?
        }
        Command::Check => Vec::new(),
    };

    processor.process(&records).await?;
    Ok(())
}

/// Searchable records from a store file, in id order
async fn load_records(path: &str, min_works: u32) -> Result<Vec<AuthorRecord>> {
    let (store, report) = InMemoryAuthorStore::load_json(path)?;
    if report.skipped > 0 {
        warn!(skipped = report.skipped, "Malformed records left out of the index");
    }
    let records = store.filter_by_min_works(min_works).await?;
    let inactive = store.count() - records.len();
    if inactive > 0 {
        info!(inactive, min_works, "Authors below the works filter left out of the index");
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<Command, clap::Error> {
        Cli::try_parse_from(std::iter::once("indexer").chain(args.iter().copied())).map(|cli| cli.command)
    }

    #[test]
    fn test_subcommands() {
        assert_eq!(parse(&["fetch"]).unwrap(), Command::Fetch);
        assert_eq!(parse(&["index"]).unwrap(), Command::Index { path: None });
        assert_eq!(
            parse(&["index", "data/a.json"]).unwrap(),
            Command::Index {
                path: Some("data/a.json".into())
            }
        );
        assert_eq!(parse(&["check"]).unwrap(), Command::Check);
        assert!(parse(&["serve"]).is_err());
        assert!(parse(&[]).is_err());
    }

    #[tokio::test]
    async fn test_index_command_with_memory_backend() {
        let path = std::env::temp_dir()
            .join(format!("reviewer-finder-index-cmd-{}.json", std::process::id()));
        let mut first = AuthorRecord::new("A2", "Grace Hopper");
        first.works_count = 5;
        let mut second = AuthorRecord::new("A1", "Ada Lovelace");
        second.works_count = 3;
        let mut idle = AuthorRecord::new("A3", "Kurt Goedel");
        idle.works_count = 2;
        write_store(&path, &[first, second, idle]).unwrap();

        let records = load_records(path.to_str().unwrap(), 3).await.unwrap();
        assert_eq!(records.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["A1", "A2"]);

        let mut config = AppConfig::default();
        config.embedding.dimension = 16;
        let command = Command::Index {
            path: Some(path.to_string_lossy().into_owned()),
        };
        assert!(run(command, &config).await.is_ok());

        let _ = std::fs::remove_file(&path);
    }
}
