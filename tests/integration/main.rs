//! End-to-end tests for collection and ingestion

mod common;
mod crawl_tests;
mod ingest_tests;
mod news_tests;
mod pipeline_tests;
