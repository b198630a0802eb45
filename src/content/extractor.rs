//! Best-effort text extraction for linked pages

use crate::crawler::{FetchResult, Fetcher};
use async_trait::async_trait;
use scraper::Html;
use std::sync::Arc;

/// Elements whose text is page chrome rather than content
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "header", "footer", "nav", "noscript"];

/// Fetches the readable text behind an external link
///
/// Implementations never fail: any error degrades to an empty string so
/// classification of the post always completes.
#[async_trait]
pub trait LinkTextExtractor: Send + Sync {
    async fn extract_text(&self, url: &str) -> String;
}

/// Extractor backed by the session's paced HTTP client
pub struct HttpTextExtractor {
    fetcher: Arc<Fetcher>,
    max_chars: usize,
}

impl HttpTextExtractor {
    pub fn new(fetcher: Arc<Fetcher>, max_chars: usize) -> Self {
        Self { fetcher, max_chars }
    }
}

#[async_trait]
impl LinkTextExtractor for HttpTextExtractor {
    /// A single attempt; the post's classification does not wait on retries
    async fn extract_text(&self, url: &str) -> String {
        match self.fetcher.fetch_once(url).await {
            FetchResult::Success { body, .. } => extract_visible_text(&body, self.max_chars),
            failure => {
                tracing::warn!(
                    "Could not fetch linked page {}: {}",
                    url,
                    failure.describe_failure()
                );
                String::new()
            }
        }
    }
}

/// Returns the visible text of an HTML document, one line per text block
///
/// Text inside script, style, header, footer, nav and noscript elements is
/// dropped, whitespace inside each block is collapsed, and the result is
/// cut at `max_chars` characters.
pub fn extract_visible_text(html: &str, max_chars: usize) -> String {
    let document = Html::parse_document(html);
    let mut lines: Vec<String> = Vec::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|el| SKIPPED_ELEMENTS.contains(&el.name()))
                .unwrap_or(false)
        });
        if hidden {
            continue;
        }

        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !collapsed.is_empty() {
            lines.push(collapsed);
        }
    }

    lines.join("\n").chars().take(max_chars).collect()
}
