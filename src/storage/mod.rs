//! Storage module for persisting harvested content
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Insert and existence checks for posts, comments and articles
//! - Counts for the statistics report

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::content::ContentType;
use crate::TidemarkError;

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(TidemarkError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, TidemarkError> {
    SqliteStorage::new(path)
}

/// Represents a post in the database
#[derive(Debug, Clone)]
pub struct PostRecord {
    pub id: String,
    pub title: Option<String>,
    pub subreddit: Option<String>,
    pub content_type: ContentType,
    pub content: Option<String>,
    pub body_text: Option<String>,
    pub file_source: Option<String>,
    pub processed_at: String,
}

/// Represents a comment in the database
#[derive(Debug, Clone)]
pub struct CommentRecord {
    pub id: String,
    pub post_id: String,
    pub parent_comment_id: Option<String>,
    pub author: Option<String>,
    pub body_text: Option<String>,
    pub processed_at: String,
}

/// Represents an article in the database
#[derive(Debug, Clone)]
pub struct ArticleRecord {
    pub id: i64,
    pub url: String,
    pub title: Option<String>,
    pub published_date: Option<String>,
    pub source: Option<String>,
    pub tags: Vec<String>,
    pub file_source: Option<String>,
    pub processed_at: String,
}
