//! Tour-Sync main entry point
//!
//! This is the command-line interface for the tour catalog synchronizer.

use anyhow::Context;
use chrono::Duration;
use clap::Parser;
use std::path::{Path, PathBuf};
use tour_sync::config::{load_config_with_hash, Config};
use tour_sync::crawler::HttpFetcher;
use tour_sync::output::{load_statistics, print_report, print_statistics, write_markdown_report};
use tour_sync::storage::{open_storage, EventStore, MemoryStore, RunStatus, SqliteStorage};
use tour_sync::SyncEngine;
use tracing_subscriber::EnvFilter;

/// Tour-Sync: keeps an event store in step with an external tour catalog
///
/// Crawls the paginated catalog, extracts every tour and its departure
/// dates, then creates, updates and archives events so the store mirrors
/// what the catalog currently lists.
#[derive(Parser, Debug)]
#[command(name = "tour-sync")]
#[command(version = "1.0.0")]
#[command(about = "Synchronize an external tour catalog into an event store", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Run the full sync against an in-memory copy of the database and print the result
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.stats {
        handle_stats(&config)
    } else if cli.dry_run {
        handle_dry_run(&config).await
    } else {
        handle_sync(&config, &config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tour_sync=info,warn"),
            1 => EnvFilter::new("tour_sync=debug,info"),
            2 => EnvFilter::new("tour_sync=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn build_engine(config: &Config) -> anyhow::Result<SyncEngine<HttpFetcher>> {
    let fetcher = HttpFetcher::from_config(&config.user_agent, &config.catalog)
        .context("Failed to build HTTP client")?;
    Ok(SyncEngine::new(fetcher, config)?)
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --dry-run mode: full pipeline, nothing written
async fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let db_path = Path::new(&config.output.database_path);

    let mut store = if db_path.exists() {
        let storage = SqliteStorage::open_read_only(db_path)
            .with_context(|| format!("Failed to open database {}", db_path.display()))?;
        MemoryStore::from_events(storage.get_all_events()?)
    } else {
        tracing::info!("No database at {}; starting from an empty store", db_path.display());
        MemoryStore::new()
    };

    let engine = build_engine(config)?;
    let report = engine.synchronize(&mut store).await?;

    println!("=== Tour-Sync Dry Run (nothing written) ===\n");
    print_report(&report);

    Ok(())
}

/// Handles the main sync: takes the run lease, syncs, records the run
async fn handle_sync(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    let mut storage = open_storage(Path::new(&config.output.database_path))
        .with_context(|| format!("Failed to open database {}", config.output.database_path))?;

    let engine = build_engine(config)?;

    let lease = Duration::seconds(config.output.run_lease_secs as i64);
    let run_id = storage.begin_run(config_hash, lease)?;
    tracing::info!("Started sync run {}", run_id);

    let report = match engine.synchronize(&mut storage).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Sync run {} failed: {}", run_id, e);
            storage.finish_run(run_id, RunStatus::Failed, &Default::default())?;
            return Err(e.into());
        }
    };

    storage.finish_run(run_id, RunStatus::Completed, &report.totals())?;

    let run = storage.get_latest_run()?;
    let summary_path = Path::new(&config.output.summary_path);
    write_markdown_report(&report, run.as_ref(), summary_path)?;
    tracing::info!("Report written to {}", summary_path.display());

    if !report.is_clean() {
        tracing::warn!("Sync finished with {} errors", report.errors.len());
    }

    Ok(())
}
