//! State module for tracking crawl progress across runs
//!
//! # Components
//!
//! - `CrawlStateStore`: persists the set of already-processed identifiers
//! - `StoppingHeuristic`: decides when a paginated listing has no new content
//! - `CrawlStatus`: the explicit status value returned up the crawl call chain

mod crawl_state;
mod stopping;

use thiserror::Error;

// Re-export main types
pub use crawl_state::{CrawlStateStore, SeenRecord};
pub(crate) use crawl_state::{parse_timestamp, write_file_atomic};
pub use stopping::{CrawlStatus, StoppingHeuristic, Verdict};

/// Errors raised while persisting crawl state
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Failed to write state file {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid stopping threshold {0}: must be at least 1")]
    InvalidThreshold(u32),
}
