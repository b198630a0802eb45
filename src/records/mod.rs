//! Data model for harvested content
//!
//! Posts own comments; articles stand alone. These are the well-typed
//! records the ingestion layer persists. The `raw` submodule holds the
//! lenient shapes read from and written to intermediate extraction files.

pub mod raw;

use crate::content::ContentType;

/// A forum post
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub url: String,
    pub author: String,
    pub score: i64,
    pub num_comments: i64,
    pub subreddit: String,
    pub created: String,
    pub created_utc: Option<f64>,
    pub external_url: Option<String>,
    pub content_type: ContentType,
    pub content: Option<String>,
    pub body_text: Option<String>,
}

/// The fields of a comment as extracted, before it is tied to a post
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommentData {
    pub id: String,
    pub author: String,
    pub created: String,
    pub created_utc: Option<f64>,
    pub body_text: String,
    pub score_dislikes: Option<i64>,
    pub score_unvoted: Option<i64>,
    pub score_likes: Option<i64>,
}

/// A comment stamped with the post it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub post_id: String,
    pub data: CommentData,
}

impl Comment {
    pub fn id(&self) -> &str {
        &self.data.id
    }
}

/// A news article
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub url: String,
    pub title: String,
    pub author: String,
    pub published_date: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
    pub source: String,
    pub scraped_at: Option<String>,
    pub tags: Vec<String>,
}
