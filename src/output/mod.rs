//! Output module for reporting what the store holds
//!
//! This module handles:
//! - Gathering row counts from the storage layer
//! - Printing them for the `--stats` command

pub mod stats;

pub use stats::{load_statistics, print_statistics, render_statistics, IngestStatistics};
