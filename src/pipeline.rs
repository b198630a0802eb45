//! Stage orchestration: collection first, then ingestion
//!
//! Ingestion only runs after a clean collection. A collection that could
//! not save its results would otherwise hand ingestion a half-written view
//! of the run, so the pipeline stops there and reports the failure.

use crate::config::Config;
use crate::crawler::{run_collection, run_news_collection};
use crate::ingest::{process_all_new_files, SourceKind};

/// How a pipeline run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    Completed,
    /// Collection failed; ingestion was skipped
    CollectionFailed,
    IngestionFailed,
}

impl PipelineOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineOutcome::Completed => "completed",
            PipelineOutcome::CollectionFailed => "collection failed",
            PipelineOutcome::IngestionFailed => "ingestion failed",
        }
    }
}

/// Runs the requested stages for the requested sources
pub async fn run_pipeline(
    config: &Config,
    kinds: &[SourceKind],
    collect: bool,
    process: bool,
) -> PipelineOutcome {
    if collect && !collect_sources(config, kinds).await {
        if process {
            tracing::error!("Collection failed, skipping ingestion");
        }
        return PipelineOutcome::CollectionFailed;
    }

    if process && !process_sources(config, kinds) {
        return PipelineOutcome::IngestionFailed;
    }

    PipelineOutcome::Completed
}

/// Collection stage; returns false if any collector could not save its results
pub async fn collect_sources(config: &Config, kinds: &[SourceKind]) -> bool {
    let mut ok = true;

    if kinds.contains(&SourceKind::Reddit) {
        match run_collection(config).await {
            Ok(report) => match &report.data_file {
                Some(path) => tracing::info!(
                    "Collected {} posts into {} ({} newly recorded)",
                    report.harvested(),
                    path.display(),
                    report.new_identifiers
                ),
                None => tracing::info!("No new posts collected"),
            },
            Err(e) => {
                tracing::error!("Collection failed: {}", e);
                ok = false;
            }
        }
    }

    if kinds.contains(&SourceKind::News) {
        if config.news.sources.is_empty() {
            tracing::info!("No news sources configured");
        } else {
            match run_news_collection(config).await {
                Ok(report) => {
                    for source in &report.sources {
                        if let Some(path) = &source.data_file {
                            tracing::info!(
                                "Collected {} articles from {} into {}",
                                source.source.harvested,
                                source.source.source,
                                path.display()
                            );
                        }
                    }
                    ok &= report.is_success();
                }
                Err(e) => {
                    tracing::error!("News collection failed: {}", e);
                    ok = false;
                }
            }
        }
    }

    ok
}

/// Ingestion stage; returns false if any file failed
pub fn process_sources(config: &Config, kinds: &[SourceKind]) -> bool {
    let mut ok = true;
    for &kind in kinds {
        let summary = process_all_new_files(kind, config);
        if !summary.is_success() {
            tracing::error!(
                "{} ingestion: {} files failed, {} could not be recorded",
                kind,
                summary.failed,
                summary.index_errors
            );
            ok = false;
        }
    }
    ok
}
