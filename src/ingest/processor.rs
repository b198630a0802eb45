//! Per-file ingestion driver
//!
//! Extraction files are ingested strictly one at a time. A file is marked
//! processed only after it was read, parsed and written through a fresh
//! database connection; any earlier failure leaves it for the next run.

use super::upserter::{IngestionUpserter, TopLevel, TreeReport};
use crate::comments::build_from_payload;
use crate::config::{Config, PathsConfig};
use crate::records::raw::{parse_news_file, parse_reddit_file};
use crate::records::Post;
use crate::state::CrawlStateStore;
use crate::storage::{SqliteStorage, Storage};
use crate::TidemarkError;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Which kind of extraction file a directory holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Reddit,
    News,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reddit => "reddit",
            Self::News => "news",
        }
    }

    /// Directory holding this source's extraction files
    pub fn data_dir<'a>(&self, paths: &'a PathsConfig) -> &'a Path {
        match self {
            Self::Reddit => &paths.reddit_data_dir,
            Self::News => &paths.news_data_dir,
        }
    }

    /// Processed-files index for this source
    pub fn index_store(&self, paths: &PathsConfig) -> CrawlStateStore {
        CrawlStateStore::new(
            paths
                .state_dir
                .join(format!("processed_{}_files_index.json", self.as_str())),
        )
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row-level tally for one ingested file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileReport {
    pub records: usize,
    pub inserted: usize,
    pub existing: usize,
    pub failed: usize,
    pub comments: TreeReport,
}

/// Outcome of one "process all new files" pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub processed: usize,
    pub failed: usize,
    /// Files ingested whose name could not be recorded in the index
    pub index_errors: usize,
}

impl IngestSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.index_errors == 0
    }
}

/// Lists extraction files not yet recorded as processed
///
/// Only `*.json` files are considered and `*_index.json` state files are
/// excluded. The result is sorted by name so files are ingested in the
/// order they were written. A missing directory yields an empty list.
pub fn list_new_files(
    dir: &Path,
    processed: &BTreeSet<String>,
) -> Result<Vec<PathBuf>, std::io::Error> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("Data directory {} does not exist yet", dir.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        if !name.ends_with(".json") || name.ends_with("_index.json") || processed.contains(name) {
            continue;
        }

        files.push(path);
    }

    files.sort();
    Ok(files)
}

/// Ingests one extraction file
///
/// Returns false if the file could not be read or parsed, or if no database
/// connection could be opened. Individual row failures are logged and do
/// not fail the file.
pub fn process_file(path: &Path, kind: SourceKind, db_path: &Path) -> bool {
    match ingest_file(path, kind, db_path) {
        Ok(report) => {
            tracing::info!(
                "Processed {}: {} records ({} new, {} existing, {} failed), comments: {} new, {} existing, {} failed, {} skipped",
                path.display(),
                report.records,
                report.inserted,
                report.existing,
                report.failed,
                report.comments.inserted,
                report.comments.existing,
                report.comments.failed,
                report.comments.skipped
            );
            true
        }
        Err(e) => {
            tracing::error!("Failed to process {}: {}", path.display(), e);
            false
        }
    }
}

/// Reads, parses and stores one file, returning its row-level report
pub fn ingest_file(path: &Path, kind: SourceKind, db_path: &Path) -> Result<FileReport, TidemarkError> {
    let content = fs::read_to_string(path)?;
    let source_file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match kind {
        SourceKind::Reddit => {
            let posts = parse_reddit_file(&content)?;
            let storage = SqliteStorage::new(db_path)?;
            Ok(ingest_posts(IngestionUpserter::new(storage), &posts, &source_file))
        }
        SourceKind::News => {
            let articles = parse_news_file(&content)?;
            let storage = SqliteStorage::new(db_path)?;
            let mut upserter = IngestionUpserter::new(storage);
            let mut report = FileReport {
                records: articles.len(),
                ..Default::default()
            };

            for article in &articles {
                match upserter.upsert_top_level(TopLevel::Article(article), &source_file) {
                    Ok(outcome) if outcome.inserted => report.inserted += 1,
                    Ok(_) => report.existing += 1,
                    Err(e) => {
                        tracing::error!("Failed to store article {}: {}", article.url, e);
                        report.failed += 1;
                    }
                }
            }
            Ok(report)
        }
    }
}

fn ingest_posts<S: Storage>(
    mut upserter: IngestionUpserter<S>,
    posts: &[(Post, Vec<Value>)],
    source_file: &str,
) -> FileReport {
    let mut report = FileReport {
        records: posts.len(),
        ..Default::default()
    };

    for (post, comments) in posts {
        match upserter.upsert_top_level(TopLevel::Post(post), source_file) {
            Ok(outcome) if outcome.inserted => report.inserted += 1,
            Ok(_) => report.existing += 1,
            Err(e) => {
                // Comments could not reference the missing post
                tracing::error!("Failed to store post {}: {}", post.id, e);
                report.failed += 1;
                continue;
            }
        }

        let roots = build_from_payload(comments, &post.id);
        report
            .comments
            .merge(upserter.upsert_comment_tree(&roots, &post.id));
    }

    report
}

/// Ingests every new file for one source and records each success
pub fn process_all_new_files(kind: SourceKind, config: &Config) -> IngestSummary {
    let mut summary = IngestSummary::default();
    let index = kind.index_store(&config.paths);
    let processed = index.load();
    let db_path = Path::new(&config.storage.database_path);

    let files = match list_new_files(kind.data_dir(&config.paths), &processed) {
        Ok(files) => files,
        Err(e) => {
            tracing::error!(
                "Could not list {} data directory {}: {}",
                kind,
                kind.data_dir(&config.paths).display(),
                e
            );
            summary.failed += 1;
            return summary;
        }
    };

    if files.is_empty() {
        tracing::info!("No new {} files to process", kind);
        return summary;
    }

    tracing::info!("Found {} new {} files", files.len(), kind);

    for path in files {
        if !process_file(&path, kind, db_path) {
            summary.failed += 1;
            continue;
        }
        summary.processed += 1;

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let mut done = BTreeSet::new();
        done.insert(name.to_string());
        if let Err(e) = index.merge_and_save(&done) {
            tracing::error!("Could not record {} as processed: {}", name, e);
            summary.index_errors += 1;
        }
    }

    tracing::info!(
        "{} ingestion finished: {} processed, {} failed",
        kind,
        summary.processed,
        summary.failed
    );
    summary
}
