use crate::config::types::{
    Config, CrawlerConfig, NewsConfig, NewsSourceConfig, PathsConfig, RedditConfig, StorageConfig,
};
use crate::ConfigError;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

const SORTS: &[&str] = &["hot", "new", "top", "rising"];
const TIME_FILTERS: &[&str] = &["hour", "day", "week", "month", "year", "all"];
const MAX_RETRIES: u32 = 10;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_reddit_config(&config.reddit)?;
    validate_news_config(&config.news)?;
    validate_storage_config(&config.storage)?;
    validate_paths_config(&config.paths)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.consecutive_seen_threshold < 1 {
        return Err(ConfigError::Validation(format!(
            "consecutive_seen_threshold must be >= 1, got {}",
            config.consecutive_seen_threshold
        )));
    }

    if config.max_items_per_source < 1 {
        return Err(ConfigError::Validation(format!(
            "max_items_per_source must be >= 1, got {}",
            config.max_items_per_source
        )));
    }

    if config.max_pages_per_source < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages_per_source must be >= 1, got {}",
            config.max_pages_per_source
        )));
    }

    if config.max_retries > MAX_RETRIES {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= {}, got {}",
            MAX_RETRIES, config.max_retries
        )));
    }

    if config.link_text_max_chars < 1 {
        return Err(ConfigError::Validation(
            "link_text_max_chars must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates reddit listing configuration
fn validate_reddit_config(config: &RedditConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    if !SORTS.contains(&config.sort.as_str()) {
        return Err(ConfigError::Validation(format!(
            "sort must be one of {:?}, got '{}'",
            SORTS, config.sort
        )));
    }

    if !TIME_FILTERS.contains(&config.time_filter.as_str()) {
        return Err(ConfigError::Validation(format!(
            "time_filter must be one of {:?}, got '{}'",
            TIME_FILTERS, config.time_filter
        )));
    }

    for subreddit in &config.subreddits {
        validate_subreddit(subreddit)?;
    }

    Ok(())
}

/// Validates the news sources
fn validate_news_config(config: &NewsConfig) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    for source in &config.sources {
        validate_news_source(source)?;
        if !names.insert(source.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate news source '{}'",
                source.name
            )));
        }
    }
    Ok(())
}

fn validate_news_source(source: &NewsSourceConfig) -> Result<(), ConfigError> {
    // The name ends up in file names
    let valid_name = !source.name.is_empty()
        && source
            .name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if !valid_name {
        return Err(ConfigError::Validation(format!(
            "News source name '{}' must be lowercase letters, digits, '-' or '_'",
            source.name
        )));
    }

    let url = Url::parse(&source.listing_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("{}: invalid listing-url: {}", source.name, e))
    })?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "{}: listing-url '{}' must use http or https",
            source.name, source.listing_url
        )));
    }

    let selectors = [
        ("article-link-selector", Some(&source.article_link_selector)),
        ("next-page-selector", source.next_page_selector.as_ref()),
        ("title-selector", Some(&source.title_selector)),
        ("author-selector", source.author_selector.as_ref()),
        ("date-selector", source.date_selector.as_ref()),
        ("description-selector", source.description_selector.as_ref()),
        ("body-selector", Some(&source.body_selector)),
        ("tag-selector", source.tag_selector.as_ref()),
    ];
    for (field, css) in selectors {
        if let Some(css) = css {
            if Selector::parse(css).is_err() {
                return Err(ConfigError::Validation(format!(
                    "{}: {} '{}' is not a valid CSS selector",
                    source.name, field, css
                )));
            }
        }
    }

    if source.max_articles < 1 || source.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "{}: max-articles and max-pages must be >= 1",
            source.name
        )));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates filesystem paths
fn validate_paths_config(config: &PathsConfig) -> Result<(), ConfigError> {
    for (name, path) in [
        ("reddit_data_dir", &config.reddit_data_dir),
        ("news_data_dir", &config.news_data_dir),
        ("state_dir", &config.state_dir),
    ] {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }
    Ok(())
}

/// Subreddit names: 2-21 characters of ASCII letters, digits and underscores
fn validate_subreddit(name: &str) -> Result<(), ConfigError> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_');

    if name.len() < 2 || name.len() > 21 || !valid_chars {
        return Err(ConfigError::Validation(format!(
            "Invalid subreddit name '{}'",
            name
        )));
    }

    Ok(())
}
