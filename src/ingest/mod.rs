//! Ingestion of harvested content into the relational store

mod processor;
mod upserter;

pub use processor::{
    ingest_file, list_new_files, process_all_new_files, process_file, FileReport, IngestSummary,
    SourceKind,
};
pub use upserter::{IngestionUpserter, TopLevel, TreeReport, UpsertOutcome};
