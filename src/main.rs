//! Tidemark main entry point
//!
//! This is the command-line interface for the Tidemark harvesting pipeline.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tidemark::config::{load_config_with_hash, Config};
use tidemark::crawler::listing_url;
use tidemark::ingest::{list_new_files, SourceKind};
use tidemark::output::{load_statistics, print_statistics};
use tidemark::pipeline::{run_pipeline, PipelineOutcome};
use tidemark::storage::open_storage;
use tracing_subscriber::EnvFilter;

/// Which sources a run touches
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SourceArg {
    Reddit,
    News,
    All,
}

impl SourceArg {
    fn kinds(self) -> Vec<SourceKind> {
        match self {
            SourceArg::Reddit => vec![SourceKind::Reddit],
            SourceArg::News => vec![SourceKind::News],
            SourceArg::All => vec![SourceKind::Reddit, SourceKind::News],
        }
    }
}

/// Tidemark: incremental content harvesting
///
/// Tidemark collects new subreddit posts with their comment trees and new
/// articles from configured news sites, then loads them into a SQLite
/// database. Both stages remember what they already handled, so reruns only
/// do new work.
#[derive(Parser, Debug)]
#[command(name = "tidemark")]
#[command(version)]
#[command(about = "Incremental content harvesting pipeline", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Run the collection stage
    #[arg(long)]
    collect: bool,

    /// Run the ingestion stage
    #[arg(long)]
    process: bool,

    /// Restrict the run to one source
    #[arg(long, value_enum, default_value_t = SourceArg::All)]
    source: SourceArg,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["collect", "process", "dry_run"])]
    stats: bool,

    /// Validate config and show what would be done without doing it
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// With neither stage flag, both stages run
    fn stages(&self) -> (bool, bool) {
        if !self.collect && !self.process {
            (true, true)
        } else {
            (self.collect, self.process)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.stats {
        handle_stats(&config)?;
        return Ok(ExitCode::SUCCESS);
    }

    let (collect, process) = cli.stages();
    let kinds = cli.source.kinds();

    if cli.dry_run {
        handle_dry_run(&config, &kinds, collect, process)?;
        return Ok(ExitCode::SUCCESS);
    }

    match run_pipeline(&config, &kinds, collect, process).await {
        PipelineOutcome::Completed => {
            tracing::info!("Pipeline finished");
            Ok(ExitCode::SUCCESS)
        }
        outcome => {
            tracing::error!("Pipeline finished with failures ({})", outcome.as_str());
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tidemark=info,warn"),
            1 => EnvFilter::new("tidemark=debug,info"),
            2 => EnvFilter::new("tidemark=trace,debug"),
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

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let storage = open_storage(Path::new(&config.storage.database_path))
        .context("Failed to open database")?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --dry-run mode: shows what each stage would touch
fn handle_dry_run(
    config: &Config,
    kinds: &[SourceKind],
    collect: bool,
    process: bool,
) -> anyhow::Result<()> {
    println!("=== Tidemark Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!(
        "  Stop after consecutive seen: {}",
        config.crawler.consecutive_seen_threshold
    );
    println!(
        "  Max items per source: {}",
        config.crawler.max_items_per_source
    );
    println!(
        "  Max pages per source: {}",
        config.crawler.max_pages_per_source
    );
    println!(
        "  Retries: {} ({}ms apart)",
        config.crawler.max_retries, config.crawler.retry_delay_ms
    );
    println!("  User agent: {}", config.crawler.user_agent);
    println!("\nDatabase: {}", config.storage.database_path);

    if collect && kinds.contains(&SourceKind::Reddit) {
        println!("\nListings to crawl ({}):", config.reddit.subreddits.len());
        for subreddit in &config.reddit.subreddits {
            println!("  - {}", listing_url(&config.reddit, subreddit));
        }
    }

    if collect && kinds.contains(&SourceKind::News) {
        println!("\nNews sources ({}):", config.news.sources.len());
        for source in &config.news.sources {
            println!(
                "  - {}: {} (up to {} articles, {} pages)",
                source.name, source.listing_url, source.max_articles, source.max_pages
            );
        }
    }

    if process {
        for &kind in kinds {
            let index = kind.index_store(&config.paths);
            let dir = kind.data_dir(&config.paths);
            let files = list_new_files(dir, &index.load())
                .with_context(|| format!("Failed to list {}", dir.display()))?;

            println!("\nNew {} files in {} ({}):", kind, dir.display(), files.len());
            for file in &files {
                println!("  - {}", file.display());
            }
        }
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}
