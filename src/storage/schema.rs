//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Tidemark database.

/// SQL schema for the database
///
/// Comments reference both their post and their parent comment; deleting
/// either cascades to the dependent comments. Article tags are stored as a
/// JSON array in a text column.
pub const SCHEMA_SQL: &str = r#"
-- Harvested forum posts
CREATE TABLE IF NOT EXISTS posts (
    id TEXT PRIMARY KEY,
    title TEXT,
    url TEXT,
    author TEXT,
    score INTEGER,
    num_comments INTEGER,
    subreddit TEXT,
    created TEXT,
    created_utc REAL,
    external_url TEXT,
    content_type TEXT NOT NULL,
    content TEXT,
    body_text TEXT,
    file_source TEXT,
    processed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_posts_subreddit ON posts(subreddit);
CREATE INDEX IF NOT EXISTS idx_posts_content_type ON posts(content_type);

-- Comment trees, one row per comment
CREATE TABLE IF NOT EXISTS comments (
    id TEXT PRIMARY KEY,
    post_id TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
    parent_comment_id TEXT REFERENCES comments(id) ON DELETE CASCADE,
    author TEXT,
    created TEXT,
    created_utc REAL,
    body_text TEXT,
    score_dislikes INTEGER,
    score_unvoted INTEGER,
    score_likes INTEGER,
    processed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id);
CREATE INDEX IF NOT EXISTS idx_comments_parent ON comments(parent_comment_id);

-- News articles
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    title TEXT,
    author TEXT,
    published_date TEXT,
    description TEXT,
    body TEXT,
    source TEXT,
    scraped_at TEXT,
    file_source TEXT,
    processed_at TEXT NOT NULL,
    tags TEXT NOT NULL DEFAULT '[]'
);

CREATE INDEX IF NOT EXISTS idx_articles_source ON articles(source);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
