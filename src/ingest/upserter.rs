//! Insert-if-absent persistence of posts, articles and comment trees

use crate::comments::CommentNode;
use crate::records::{Article, Comment, Post};
use crate::storage::{Storage, StorageResult};
use chrono::Utc;
use std::borrow::Cow;

/// A top-level entity to persist
#[derive(Debug, Clone, Copy)]
pub enum TopLevel<'a> {
    Post(&'a Post),
    Article(&'a Article),
}

impl TopLevel<'_> {
    /// Unique key: post id or article url
    pub fn key(&self) -> &str {
        match self {
            TopLevel::Post(post) => &post.id,
            TopLevel::Article(article) => &article.url,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            TopLevel::Post(_) => "post",
            TopLevel::Article(_) => "article",
        }
    }
}

/// Result of persisting one top-level entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub key: String,
    /// False when a row with this key already existed
    pub inserted: bool,
}

/// Per-tree tally of comment inserts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeReport {
    pub inserted: usize,
    pub existing: usize,
    pub failed: usize,
    /// Descendants of failed comments, never attempted
    pub skipped: usize,
}

impl TreeReport {
    pub fn merge(&mut self, other: TreeReport) {
        self.inserted += other.inserted;
        self.existing += other.existing;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }

    pub fn total(&self) -> usize {
        self.inserted + self.existing + self.failed + self.skipped
    }
}

/// Writes harvested content into a `Storage` without duplicating rows
///
/// Existing rows are never updated. Each insert is its own unit of work, so
/// a failed row is rolled back alone and the rest of the batch proceeds.
pub struct IngestionUpserter<S: Storage> {
    storage: S,
}

impl<S: Storage> IngestionUpserter<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Inserts a post or article unless a row with its key already exists
    ///
    /// # Arguments
    ///
    /// * `entity` - The post or article
    /// * `source_file` - Extraction file name recorded as `file_source`
    ///
    /// # Returns
    ///
    /// * `Ok(UpsertOutcome)` - The key, and whether a row was written
    /// * `Err(StorageError)` - The lookup or insert failed and was rolled back
    pub fn upsert_top_level(
        &mut self,
        entity: TopLevel<'_>,
        source_file: &str,
    ) -> StorageResult<UpsertOutcome> {
        let key = entity.key().to_string();

        let exists = match entity {
            TopLevel::Post(post) => self.storage.post_exists(&post.id)?,
            TopLevel::Article(article) => self.storage.article_exists(&article.url)?,
        };

        if exists {
            tracing::debug!("{} {} already stored", entity.kind(), key);
            return Ok(UpsertOutcome {
                key,
                inserted: false,
            });
        }

        let now = Utc::now();
        match entity {
            TopLevel::Post(post) => self.storage.insert_post(post, source_file, now)?,
            TopLevel::Article(article) => self.storage.insert_article(article, source_file, now)?,
        }

        tracing::trace!("Inserted {} {}", entity.kind(), key);
        Ok(UpsertOutcome {
            key,
            inserted: true,
        })
    }

    /// Inserts a comment tree depth-first, parents before children
    ///
    /// A comment that already exists still has its replies visited, so a
    /// re-run completes replies that failed earlier. A comment that fails
    /// to insert takes its replies with it (they could not reference it),
    /// but its siblings and every other subtree are still attempted.
    pub fn upsert_comment_tree(&mut self, roots: &[CommentNode], post_id: &str) -> TreeReport {
        let mut report = TreeReport::default();
        for root in roots {
            self.upsert_comment(root, None, post_id, &mut report);
        }

        if report.failed > 0 {
            tracing::warn!(
                "Post {}: {} comments failed, {} replies skipped",
                post_id,
                report.failed,
                report.skipped
            );
        }
        report
    }

    fn upsert_comment(
        &mut self,
        node: &CommentNode,
        parent: Option<&str>,
        post_id: &str,
        report: &mut TreeReport,
    ) {
        let id = node.id();

        let stored = match self.storage.comment_exists(id) {
            Ok(true) => {
                report.existing += 1;
                true
            }
            Ok(false) => {
                let comment = with_post_id(&node.comment, post_id);
                match self.storage.insert_comment(&comment, parent, Utc::now()) {
                    Ok(()) => {
                        report.inserted += 1;
                        true
                    }
                    Err(e) => {
                        tracing::error!("Failed to insert comment {} (post {}): {}", id, post_id, e);
                        false
                    }
                }
            }
            Err(e) => {
                tracing::error!("Failed to look up comment {} (post {}): {}", id, post_id, e);
                false
            }
        };

        if !stored {
            report.failed += 1;
            report.skipped += node.len() - 1;
            return;
        }

        for child in &node.children {
            self.upsert_comment(child, Some(id), post_id, report);
        }
    }
}

/// The comment as it should be stored under `post_id`
fn with_post_id<'a>(comment: &'a Comment, post_id: &str) -> Cow<'a, Comment> {
    if comment.post_id == post_id {
        Cow::Borrowed(comment)
    } else {
        tracing::debug!(
            "Comment {} stamped with post {}, storing under {}",
            comment.id(),
            comment.post_id,
            post_id
        );
        Cow::Owned(Comment {
            post_id: post_id.to_string(),
            data: comment.data.clone(),
        })
    }
}
