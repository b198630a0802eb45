//! Intermediate extraction file shapes
//!
//! Extraction files are JSON arrays with one object per post or article.
//! Upstream collectors have not always agreed on field types (scores as
//! strings, timestamps as strings or numbers), so every field is read
//! leniently and a record that still fails to parse is skipped on its own.

use super::{Article, Post};
use crate::content::ContentType;
use crate::state::parse_timestamp;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A post record as stored in a reddit extraction file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPost {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub score: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub num_comments: Option<i64>,
    #[serde(default)]
    pub subreddit: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub created_utc: Option<f64>,
    #[serde(default)]
    pub external_url: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub body_text: Option<String>,
    /// Comment payloads, nested objects or legacy JSON-encoded strings
    #[serde(default, deserialize_with = "null_as_empty")]
    pub comments: Vec<Value>,
}

impl RawPost {
    /// Builds the file record for a harvested post
    pub fn from_post(post: &Post, comments: Vec<Value>) -> Self {
        Self {
            id: Some(post.id.clone()),
            title: Some(post.title.clone()),
            url: Some(post.url.clone()),
            author: Some(post.author.clone()),
            score: Some(post.score),
            num_comments: Some(post.num_comments),
            subreddit: Some(post.subreddit.clone()),
            created: Some(post.created.clone()),
            created_utc: post.created_utc,
            external_url: post.external_url.clone(),
            content_type: Some(post.content_type.to_db_string().to_string()),
            content: post.content.clone(),
            body_text: post.body_text.clone(),
            comments,
        }
    }

    /// Converts into a typed post plus its comment payloads
    ///
    /// Returns `None` when the record has no usable id.
    pub fn into_post(self) -> Option<(Post, Vec<Value>)> {
        let id = self.id.filter(|id| !id.trim().is_empty())?;

        let content_type = match self.content_type.as_deref() {
            None => ContentType::Unknown,
            Some(value) => ContentType::from_db_string(value).unwrap_or_else(|| {
                tracing::warn!("Post {} has unknown content type '{}'", id, value);
                ContentType::Unknown
            }),
        };

        let post = Post {
            title: self.title.unwrap_or_default(),
            url: self.url.unwrap_or_default(),
            author: self.author.unwrap_or_default(),
            score: self.score.unwrap_or(0),
            num_comments: self.num_comments.unwrap_or(0),
            subreddit: self.subreddit.unwrap_or_default(),
            created: self.created.unwrap_or_default(),
            created_utc: self.created_utc,
            external_url: self.external_url,
            content_type,
            content: self.content,
            body_text: self.body_text,
            id,
        };

        Some((post, self.comments))
    }
}

/// An article record as stored in a news extraction file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawArticle {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub published_date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub scraped_at: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
}

impl RawArticle {
    /// Converts into a typed article; `None` when the record has no url
    pub fn into_article(self) -> Option<Article> {
        let url = self.url.filter(|url| !url.trim().is_empty())?;

        Some(Article {
            published_date: self
                .published_date
                .map(|d| normalize_date(&d, "published_date", &url)),
            scraped_at: self.scraped_at.map(|d| normalize_date(&d, "scraped_at", &url)),
            title: self.title.unwrap_or_default(),
            author: self.author.unwrap_or_default(),
            description: self.description,
            body: self.body,
            source: self.source.unwrap_or_default(),
            tags: self.tags,
            url,
        })
    }
}

/// Parses a reddit extraction file into posts and their comment payloads
///
/// # Returns
///
/// * `Ok(Vec<...>)` - Every record that could be read; bad records are skipped
/// * `Err(serde_json::Error)` - The file is not a JSON array
pub fn parse_reddit_file(content: &str) -> Result<Vec<(Post, Vec<Value>)>, serde_json::Error> {
    let records: Vec<RawPost> = parse_entries(content, "post")?;
    let total = records.len();

    let posts: Vec<(Post, Vec<Value>)> = records
        .into_iter()
        .filter_map(RawPost::into_post)
        .collect();

    if posts.len() < total {
        tracing::warn!("Skipped {} post records without an id", total - posts.len());
    }
    Ok(posts)
}

/// Parses a news extraction file into articles
pub fn parse_news_file(content: &str) -> Result<Vec<Article>, serde_json::Error> {
    let records: Vec<RawArticle> = parse_entries(content, "article")?;
    let total = records.len();

    let articles: Vec<Article> = records
        .into_iter()
        .filter_map(RawArticle::into_article)
        .collect();

    if articles.len() < total {
        tracing::warn!(
            "Skipped {} article records without a url",
            total - articles.len()
        );
    }
    Ok(articles)
}

/// Reads a JSON array and deserializes each element on its own
fn parse_entries<T: DeserializeOwned>(content: &str, kind: &str) -> Result<Vec<T>, serde_json::Error> {
    let values: Vec<Value> = serde_json::from_str(content)?;
    let mut entries = Vec::with_capacity(values.len());

    for (index, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<T>(value) {
            Ok(entry) => entries.push(entry),
            Err(e) => tracing::warn!("Skipping malformed {} record #{}: {}", kind, index, e),
        }
    }

    Ok(entries)
}

/// Normalises a date to RFC 3339, keeping the original text if unparseable
pub fn normalize_date(value: &str, field: &str, key: &str) -> String {
    let trimmed = value.trim();

    if let Some(dt) = parse_timestamp(trimmed) {
        return dt.to_rfc3339();
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return midnight.and_utc().to_rfc3339();
        }
    }

    tracing::warn!(
        "Unrecognised {} '{}' for {}, storing as given",
        field,
        value,
        key
    );
    value.to_string()
}

/// Parses counts such as `"42"`, `"1,204"` or `"17 comments"`
pub(crate) fn parse_count(text: &str) -> Option<i64> {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '-')
        .filter(|c| *c != ',')
        .collect();
    digits.parse().ok()
}

pub(crate) fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => parse_count(&s),
        _ => None,
    })
}

pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
