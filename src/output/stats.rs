//! Statistics gathered from the ingestion database
//!
//! This module provides functionality for extracting and displaying
//! row counts from the storage layer.

use crate::storage::Storage;
use crate::TidemarkError;
use std::fmt::Write;

/// Ingestion statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStatistics {
    /// Total number of posts
    pub total_posts: u64,

    /// Total number of comments at any depth
    pub total_comments: u64,

    /// Comments attached directly to a post
    pub top_level_comments: u64,

    /// Total number of news articles
    pub total_articles: u64,

    /// Post counts per content type, most common first
    pub posts_by_content_type: Vec<(String, u64)>,
}

impl IngestStatistics {
    /// Comments that answer another comment
    pub fn replies(&self) -> u64 {
        self.total_comments.saturating_sub(self.top_level_comments)
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(IngestStatistics)` - Successfully loaded statistics
/// * `Err(TidemarkError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<IngestStatistics, TidemarkError> {
    Ok(IngestStatistics {
        total_posts: storage.count_posts()?,
        total_comments: storage.count_comments()?,
        top_level_comments: storage.count_top_level_comments()?,
        total_articles: storage.count_articles()?,
        posts_by_content_type: storage.count_posts_by_content_type()?,
    })
}

/// Formats statistics as a plain-text report
pub fn render_statistics(stats: &IngestStatistics) -> String {
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "=== Ingestion Statistics ===\n");
    let _ = writeln!(out, "Overview:");
    let _ = writeln!(out, "  Posts: {}", stats.total_posts);
    let _ = writeln!(
        out,
        "  Comments: {} ({} top-level, {} replies)",
        stats.total_comments,
        stats.top_level_comments,
        stats.replies()
    );
    let _ = writeln!(out, "  Articles: {}", stats.total_articles);

    if !stats.posts_by_content_type.is_empty() {
        let _ = writeln!(out, "\nPosts by Content Type:");
        for (content_type, count) in &stats.posts_by_content_type {
            let percentage = if stats.total_posts > 0 {
                (*count as f64 / stats.total_posts as f64) * 100.0
            } else {
                0.0
            };
            let _ = writeln!(out, "  {}: {} ({:.1}%)", content_type, count, percentage);
        }
    }

    out
}

/// Prints statistics to stdout
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &IngestStatistics) {
    print!("{}", render_statistics(stats));
}
