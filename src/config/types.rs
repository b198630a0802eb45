use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Tidemark
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub reddit: RedditConfig,
    #[serde(default)]
    pub news: NewsConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Minimum time between consecutive requests (milliseconds)
    #[serde(rename = "request-delay-ms", default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Consecutive already-seen listing items that end a source
    #[serde(
        rename = "consecutive-seen-threshold",
        default = "default_consecutive_seen_threshold"
    )]
    pub consecutive_seen_threshold: u32,

    /// Maximum number of new items harvested per source in one session
    #[serde(
        rename = "max-items-per-source",
        default = "default_max_items_per_source"
    )]
    pub max_items_per_source: u32,

    /// Maximum number of listing pages followed per source
    #[serde(
        rename = "max-pages-per-source",
        default = "default_max_pages_per_source"
    )]
    pub max_pages_per_source: u32,

    /// Extra attempts for a request that failed transiently
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Pause before each retry (milliseconds)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Upper bound on text extracted from an external link
    #[serde(rename = "link-text-max-chars", default = "default_link_text_max_chars")]
    pub link_text_max_chars: usize,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: default_request_delay_ms(),
            consecutive_seen_threshold: default_consecutive_seen_threshold(),
            max_items_per_source: default_max_items_per_source(),
            max_pages_per_source: default_max_pages_per_source(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            link_text_max_chars: default_link_text_max_chars(),
            user_agent: default_user_agent(),
        }
    }
}

/// Reddit listing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedditConfig {
    /// Base URL of the listing site (old-style markup)
    #[serde(rename = "base-url", default = "default_reddit_base_url")]
    pub base_url: String,

    /// Subreddits to harvest, without the `r/` prefix
    #[serde(default)]
    pub subreddits: Vec<String>,

    /// Listing sort: hot, new, top or rising
    #[serde(default = "default_sort")]
    pub sort: String,

    /// Time window used with the `top` sort
    #[serde(rename = "time-filter", default = "default_time_filter")]
    pub time_filter: String,
}

/// News collection configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewsConfig {
    /// One entry per `[[news.sources]]` table
    #[serde(default)]
    pub sources: Vec<NewsSourceConfig>,
}

/// One news site: where its listing lives and how to read its articles
///
/// Selectors are CSS. A date or description element is read from its
/// `content` or `datetime` attribute when present, so `<meta>` tags work.
#[derive(Debug, Clone, Deserialize)]
pub struct NewsSourceConfig {
    /// Short name used for the source field and for file names
    pub name: String,

    /// First listing page
    #[serde(rename = "listing-url")]
    pub listing_url: String,

    /// Anchors on the listing page that lead to articles
    #[serde(rename = "article-link-selector")]
    pub article_link_selector: String,

    /// Anchor of the next listing page
    #[serde(rename = "next-page-selector", default)]
    pub next_page_selector: Option<String>,

    #[serde(rename = "title-selector", default = "default_title_selector")]
    pub title_selector: String,

    #[serde(rename = "author-selector", default)]
    pub author_selector: Option<String>,

    #[serde(rename = "date-selector", default)]
    pub date_selector: Option<String>,

    #[serde(rename = "description-selector", default)]
    pub description_selector: Option<String>,

    #[serde(rename = "body-selector", default = "default_body_selector")]
    pub body_selector: String,

    #[serde(rename = "tag-selector", default)]
    pub tag_selector: Option<String>,

    /// Whether to keep the article body
    #[serde(rename = "scrape-body", default = "default_scrape_body")]
    pub scrape_body: bool,

    /// Maximum number of new articles per session
    #[serde(rename = "max-articles", default = "default_max_articles")]
    pub max_articles: u32,

    /// Maximum number of listing pages followed
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,
}

/// Relational store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Filesystem locations for extraction files and state
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// Directory holding reddit extraction files
    #[serde(rename = "reddit-data-dir", default = "default_reddit_data_dir")]
    pub reddit_data_dir: PathBuf,

    /// Directory holding news extraction files
    #[serde(rename = "news-data-dir", default = "default_news_data_dir")]
    pub news_data_dir: PathBuf,

    /// Directory holding processed-file indexes
    #[serde(rename = "state-dir", default = "default_state_dir")]
    pub state_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            reddit_data_dir: default_reddit_data_dir(),
            news_data_dir: default_news_data_dir(),
            state_dir: default_state_dir(),
        }
    }
}

fn default_request_delay_ms() -> u64 {
    2000
}

fn default_consecutive_seen_threshold() -> u32 {
    3
}

fn default_max_items_per_source() -> u32 {
    25
}

fn default_max_pages_per_source() -> u32 {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_link_text_max_chars() -> usize {
    5000
}

fn default_user_agent() -> String {
    format!("tidemark/{}", env!("CARGO_PKG_VERSION"))
}

fn default_reddit_base_url() -> String {
    "https://old.reddit.com".to_string()
}

fn default_sort() -> String {
    "new".to_string()
}

fn default_time_filter() -> String {
    "month".to_string()
}

fn default_title_selector() -> String {
    "h1".to_string()
}

fn default_body_selector() -> String {
    "article p".to_string()
}

fn default_scrape_body() -> bool {
    true
}

fn default_max_articles() -> u32 {
    5
}

fn default_max_pages() -> u32 {
    1
}

fn default_reddit_data_dir() -> PathBuf {
    PathBuf::from("raw_data/reddit")
}

fn default_news_data_dir() -> PathBuf {
    PathBuf::from("raw_data/news")
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("data_pipeline")
}
