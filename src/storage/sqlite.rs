//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::content::ContentType;
use crate::records::{Article, Comment, Post};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{ArticleRecord, CommentRecord, PostRecord};
use crate::TidemarkError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(TidemarkError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, TidemarkError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, TidemarkError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn exists(&self, sql: &str, key: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(sql, params![key], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

/// Maps constraint failures to a keyed error for the log line
fn insert_error(err: rusqlite::Error, key: &str) -> StorageError {
    match &err {
        rusqlite::Error::SqliteFailure(e, message) if e.code == ErrorCode::ConstraintViolation => {
            StorageError::ConstraintViolation {
                key: key.to_string(),
                message: message.clone().unwrap_or_else(|| e.to_string()),
            }
        }
        _ => StorageError::Sqlite(err),
    }
}

impl Storage for SqliteStorage {
    // ===== Posts =====

    fn post_exists(&self, id: &str) -> StorageResult<bool> {
        self.exists("SELECT 1 FROM posts WHERE id = ?1", id)
    }

    fn insert_post(
        &mut self,
        post: &Post,
        file_source: &str,
        processed_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO posts (id, title, url, author, score, num_comments, subreddit, created,
             created_utc, external_url, content_type, content, body_text, file_source, processed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                post.id,
                post.title,
                post.url,
                post.author,
                post.score,
                post.num_comments,
                post.subreddit,
                post.created,
                post.created_utc,
                post.external_url,
                post.content_type.to_db_string(),
                post.content,
                post.body_text,
                file_source,
                processed_at.to_rfc3339(),
            ],
        )
        .map_err(|e| insert_error(e, &post.id))?;
        tx.commit()?;
        Ok(())
    }

    fn get_post(&self, id: &str) -> StorageResult<Option<PostRecord>> {
        let post = self
            .conn
            .query_row(
                "SELECT id, title, subreddit, content_type, content, body_text, file_source,
                 processed_at FROM posts WHERE id = ?1",
                params![id],
                |row| {
                    Ok(PostRecord {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        subreddit: row.get(2)?,
                        content_type: ContentType::from_db_string(&row.get::<_, String>(3)?)
                            .unwrap_or(ContentType::Unknown),
                        content: row.get(4)?,
                        body_text: row.get(5)?,
                        file_source: row.get(6)?,
                        processed_at: row.get(7)?,
                    })
                },
            )
            .optional()?;

        Ok(post)
    }

    // ===== Comments =====

    fn comment_exists(&self, id: &str) -> StorageResult<bool> {
        self.exists("SELECT 1 FROM comments WHERE id = ?1", id)
    }

    fn insert_comment(
        &mut self,
        comment: &Comment,
        parent_comment_id: Option<&str>,
        processed_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let data = &comment.data;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO comments (id, post_id, parent_comment_id, author, created, created_utc,
             body_text, score_dislikes, score_unvoted, score_likes, processed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                data.id,
                comment.post_id,
                parent_comment_id,
                data.author,
                data.created,
                data.created_utc,
                data.body_text,
                data.score_dislikes,
                data.score_unvoted,
                data.score_likes,
                processed_at.to_rfc3339(),
            ],
        )
        .map_err(|e| insert_error(e, &data.id))?;
        tx.commit()?;
        Ok(())
    }

    fn get_comment(&self, id: &str) -> StorageResult<Option<CommentRecord>> {
        let comment = self
            .conn
            .query_row(
                "SELECT id, post_id, parent_comment_id, author, body_text, processed_at
                 FROM comments WHERE id = ?1",
                params![id],
                |row| {
                    Ok(CommentRecord {
                        id: row.get(0)?,
                        post_id: row.get(1)?,
                        parent_comment_id: row.get(2)?,
                        author: row.get(3)?,
                        body_text: row.get(4)?,
                        processed_at: row.get(5)?,
                    })
                },
            )
            .optional()?;

        Ok(comment)
    }

    // ===== Articles =====

    fn article_exists(&self, url: &str) -> StorageResult<bool> {
        self.exists("SELECT 1 FROM articles WHERE url = ?1", url)
    }

    fn insert_article(
        &mut self,
        article: &Article,
        file_source: &str,
        processed_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let tags = serde_json::to_string(&article.tags)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO articles (url, title, author, published_date, description, body,
             source, scraped_at, file_source, processed_at, tags)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                article.url,
                article.title,
                article.author,
                article.published_date,
                article.description,
                article.body,
                article.source,
                article.scraped_at,
                file_source,
                processed_at.to_rfc3339(),
                tags,
            ],
        )
        .map_err(|e| insert_error(e, &article.url))?;
        tx.commit()?;
        Ok(())
    }

    fn get_article(&self, url: &str) -> StorageResult<Option<ArticleRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, url, title, published_date, source, tags, file_source, processed_at
                 FROM articles WHERE url = ?1",
                params![url],
                |row| {
                    Ok((
                        ArticleRecord {
                            id: row.get(0)?,
                            url: row.get(1)?,
                            title: row.get(2)?,
                            published_date: row.get(3)?,
                            source: row.get(4)?,
                            tags: Vec::new(),
                            file_source: row.get(6)?,
                            processed_at: row.get(7)?,
                        },
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((mut record, tags)) => {
                record.tags = serde_json::from_str(&tags)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    // ===== Statistics =====

    fn count_posts(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM posts")
    }

    fn count_comments(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM comments")
    }

    fn count_top_level_comments(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM comments WHERE parent_comment_id IS NULL")
    }

    fn count_articles(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM articles")
    }

    fn count_posts_by_content_type(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT content_type, COUNT(*) FROM posts
             GROUP BY content_type ORDER BY COUNT(*) DESC, content_type",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}
