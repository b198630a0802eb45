//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::records::{Article, Comment, Post};
use crate::storage::{ArticleRecord, CommentRecord, PostRecord};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Constraint violation for {key}: {message}")]
    ConstraintViolation { key: String, message: String },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Every insert runs as its own unit of work: it either commits in full or
/// leaves the store untouched.
pub trait Storage {
    // ===== Posts =====

    /// Returns true if a post with this id exists
    fn post_exists(&self, id: &str) -> StorageResult<bool>;

    /// Inserts a new post
    ///
    /// # Arguments
    ///
    /// * `post` - The post to insert
    /// * `file_source` - Name of the extraction file the post came from
    /// * `processed_at` - Ingestion timestamp
    fn insert_post(
        &mut self,
        post: &Post,
        file_source: &str,
        processed_at: DateTime<Utc>,
    ) -> StorageResult<()>;

    /// Gets a post by id
    fn get_post(&self, id: &str) -> StorageResult<Option<PostRecord>>;

    // ===== Comments =====

    /// Returns true if a comment with this id exists
    fn comment_exists(&self, id: &str) -> StorageResult<bool>;

    /// Inserts a new comment under its post and optional parent comment
    fn insert_comment(
        &mut self,
        comment: &Comment,
        parent_comment_id: Option<&str>,
        processed_at: DateTime<Utc>,
    ) -> StorageResult<()>;

    /// Gets a comment by id
    fn get_comment(&self, id: &str) -> StorageResult<Option<CommentRecord>>;

    // ===== Articles =====

    /// Returns true if an article with this url exists
    fn article_exists(&self, url: &str) -> StorageResult<bool>;

    /// Inserts a new article
    fn insert_article(
        &mut self,
        article: &Article,
        file_source: &str,
        processed_at: DateTime<Utc>,
    ) -> StorageResult<()>;

    /// Gets an article by url
    fn get_article(&self, url: &str) -> StorageResult<Option<ArticleRecord>>;

    // ===== Statistics =====

    /// Gets total post count
    fn count_posts(&self) -> StorageResult<u64>;

    /// Gets total comment count
    fn count_comments(&self) -> StorageResult<u64>;

    /// Gets count of comments without a parent comment
    fn count_top_level_comments(&self) -> StorageResult<u64>;

    /// Gets total article count
    fn count_articles(&self) -> StorageResult<u64>;

    /// Gets post counts per content type, most common first
    fn count_posts_by_content_type(&self) -> StorageResult<Vec<(String, u64)>>;
}
