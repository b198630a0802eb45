//! News collection driven by per-site CSS selectors
//!
//! Each `[[news.sources]]` entry names a listing page and the selectors that
//! pick out article links and article fields. A source keeps its own crawl
//! state, keyed by article URL, in the news data directory and writes what
//! it harvested to `<name>_<stamp>.json` in the shape ingestion reads.

use super::fetcher::Fetcher;
use super::parser::{joined_text, push_unique, ExtractError};
use super::session::{data_file_path, SourceReport};
use crate::config::{Config, NewsSourceConfig};
use crate::records::raw::{normalize_date, RawArticle};
use crate::state::{write_file_atomic, CrawlStateStore, CrawlStatus, StoppingHeuristic};
use crate::{ConfigError, TidemarkError};
use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// Crawl state file of a news source inside the news data directory
pub fn news_state_path(dir: &Path, source: &str) -> PathBuf {
    dir.join(format!("{}_url_index.json", source))
}

/// Compiled selectors of one news source
#[derive(Debug)]
pub struct NewsSelectors {
    link: Selector,
    next_page: Option<Selector>,
    title: Selector,
    author: Option<Selector>,
    date: Option<Selector>,
    description: Option<Selector>,
    body: Selector,
    tags: Option<Selector>,
}

impl NewsSelectors {
    pub fn compile(source: &NewsSourceConfig) -> Result<Self, ConfigError> {
        let optional = |css: &Option<String>| css.as_deref().map(compile).transpose();

        Ok(Self {
            link: compile(&source.article_link_selector)?,
            next_page: optional(&source.next_page_selector)?,
            title: compile(&source.title_selector)?,
            author: optional(&source.author_selector)?,
            date: optional(&source.date_selector)?,
            description: optional(&source.description_selector)?,
            body: compile(&source.body_selector)?,
            tags: optional(&source.tag_selector)?,
        })
    }
}

fn compile(css: &str) -> Result<Selector, ConfigError> {
    Selector::parse(css)
        .map_err(|_| ConfigError::Validation(format!("Invalid CSS selector '{}'", css)))
}

/// Article links found on one listing page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewsListing {
    /// Absolute article URLs without fragments, in page order
    pub article_urls: Vec<String>,
    pub next_page: Option<String>,
}

/// Collects article links and the next-page link from a listing page
///
/// Links are resolved against `page_url`; anything that is not http(s)
/// after resolution is ignored, and repeats keep their first position.
pub fn parse_article_links(html: &str, page_url: &Url, selectors: &NewsSelectors) -> NewsListing {
    let document = Html::parse_document(html);
    let mut listing = NewsListing::default();

    for anchor in document.select(&selectors.link) {
        if let Some(url) = anchor.value().attr("href").and_then(|h| resolve(page_url, h)) {
            push_unique(&mut listing.article_urls, &url);
        }
    }

    listing.next_page = selectors.next_page.as_ref().and_then(|sel| {
        document
            .select(sel)
            .find_map(|a| a.value().attr("href"))
            .and_then(|href| resolve(page_url, href))
    });

    listing
}

fn resolve(base: &Url, href: &str) -> Option<String> {
    let mut url = base.join(href.trim()).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}

/// Reads one article page into an extraction record
///
/// Only the title is required. Several author elements are joined with
/// ", ", body paragraphs with a space, and tags are kept once each.
pub fn parse_article(
    html: &str,
    url: &str,
    source: &NewsSourceConfig,
    selectors: &NewsSelectors,
) -> Result<RawArticle, ExtractError> {
    let document = Html::parse_document(html);

    let title = document
        .select(&selectors.title)
        .map(|el| joined_text(el, " "))
        .find(|t| !t.is_empty())
        .ok_or(ExtractError::Missing("title"))?;

    let author = selectors
        .author
        .as_ref()
        .map(|sel| distinct_texts(&document, sel).join(", "))
        .filter(|a| !a.is_empty());

    let published_date = selectors
        .date
        .as_ref()
        .and_then(|sel| document.select(sel).find_map(element_value))
        .map(|d| normalize_date(&d, "published_date", url));

    let description = selectors
        .description
        .as_ref()
        .and_then(|sel| document.select(sel).find_map(element_value));

    let body = if source.scrape_body {
        let paragraphs: Vec<String> = document
            .select(&selectors.body)
            .map(|el| joined_text(el, " "))
            .filter(|p| !p.is_empty())
            .collect();
        Some(paragraphs.join(" ")).filter(|b| !b.is_empty())
    } else {
        None
    };

    let tags = selectors
        .tags
        .as_ref()
        .map(|sel| distinct_texts(&document, sel))
        .unwrap_or_default();

    Ok(RawArticle {
        url: Some(url.to_string()),
        title: Some(title),
        author,
        published_date,
        description,
        body,
        source: Some(source.name.clone()),
        scraped_at: Some(Utc::now().to_rfc3339()),
        tags,
    })
}

/// `content` or `datetime` attribute when present, the element text otherwise
fn element_value(el: ElementRef<'_>) -> Option<String> {
    el.value()
        .attr("content")
        .or_else(|| el.value().attr("datetime"))
        .map(|v| v.trim().to_string())
        .or_else(|| Some(joined_text(el, " ")))
        .filter(|v| !v.is_empty())
}

fn distinct_texts(document: &Html, selector: &Selector) -> Vec<String> {
    let mut texts = Vec::new();
    for el in document.select(selector) {
        let text = joined_text(el, " ");
        if !text.is_empty() {
            push_unique(&mut texts, &text);
        }
    }
    texts
}

/// Outcome of one news source
#[derive(Debug, Clone)]
pub struct NewsReport {
    pub source: SourceReport,
    /// Extraction file written, `None` if nothing new was harvested
    pub data_file: Option<PathBuf>,
    pub new_identifiers: usize,
}

/// Outcome of a news collection pass
#[derive(Debug, Clone, Default)]
pub struct NewsCollectionReport {
    pub sources: Vec<NewsReport>,
    /// Sources whose results could not be saved
    pub failed_sources: Vec<String>,
}

impl NewsCollectionReport {
    pub fn harvested(&self) -> usize {
        self.sources.iter().map(|s| s.source.harvested).sum()
    }

    pub fn is_success(&self) -> bool {
        self.failed_sources.is_empty()
    }
}

/// One harvesting pass over a single news source
pub struct NewsCollector<'a> {
    source: &'a NewsSourceConfig,
    selectors: NewsSelectors,
    fetcher: Arc<Fetcher>,
    data_dir: &'a Path,
    state: CrawlStateStore,
    heuristic: StoppingHeuristic,
    seen: BTreeSet<String>,
    new_identifiers: BTreeSet<String>,
    harvested: Vec<RawArticle>,
    report: SourceReport,
}

impl<'a> NewsCollector<'a> {
    pub fn new(
        config: &'a Config,
        source: &'a NewsSourceConfig,
        fetcher: Arc<Fetcher>,
    ) -> Result<Self, TidemarkError> {
        let data_dir = config.paths.news_data_dir.as_path();
        let state = CrawlStateStore::new(news_state_path(data_dir, &source.name));
        let seen = state.load();
        tracing::info!(
            "{}: loaded {} previously processed articles",
            source.name,
            seen.len()
        );

        Ok(Self {
            selectors: NewsSelectors::compile(source)?,
            heuristic: StoppingHeuristic::new(config.crawler.consecutive_seen_threshold)?,
            report: SourceReport::new(&source.name),
            source,
            fetcher,
            data_dir,
            state,
            seen,
            new_identifiers: BTreeSet::new(),
            harvested: Vec::new(),
        })
    }

    fn is_seen(&self, url: &str) -> bool {
        self.seen.contains(url) || self.new_identifiers.contains(url)
    }

    /// Walks the source's listing pages until a terminal status
    ///
    /// Failure handling matches the subreddit loop: a listing page that
    /// cannot be fetched ends the source, an article that cannot be fetched
    /// or has no title is skipped and left for the next run.
    pub async fn crawl(&mut self) -> CrawlStatus {
        let source = self.source;
        let max_articles = source.max_articles as usize;
        self.heuristic.reset();

        let mut next = Some(source.listing_url.clone());
        tracing::info!("Crawling news source {}", source.name);

        'pages: while let Some(url) = next.take() {
            if self.report.pages >= source.max_pages {
                tracing::info!("{}: page limit of {} reached", source.name, source.max_pages);
                break;
            }

            let page_url = match Url::parse(&url) {
                Ok(u) => u,
                Err(e) => {
                    tracing::warn!("{}: invalid listing URL {}: {}", source.name, url, e);
                    break;
                }
            };

            let html = match self.fetcher.fetch_html(&url).await {
                Ok(html) => html,
                Err(e) => {
                    tracing::warn!("{}: listing fetch failed: {}", source.name, e);
                    break;
                }
            };
            self.report.pages += 1;

            let listing = parse_article_links(&html, &page_url, &self.selectors);
            tracing::debug!(
                "{}: {} article links on {}",
                source.name,
                listing.article_urls.len(),
                url
            );

            for article_url in &listing.article_urls {
                let seen = self.is_seen(article_url);

                let verdict = CrawlStatus::from(self.heuristic.feed(seen));
                if verdict.is_terminal() {
                    tracing::info!(
                        "{}: {} consecutive processed articles, stopping",
                        source.name,
                        self.heuristic.consecutive_seen()
                    );
                    self.report.status = verdict;
                    break 'pages;
                }

                if seen {
                    tracing::debug!("Already processed: {}", article_url);
                    self.report.already_seen += 1;
                    continue;
                }

                if self.report.harvested >= max_articles {
                    tracing::info!("{}: article cap of {} reached", source.name, max_articles);
                    self.report.status = CrawlStatus::CapReached;
                    break 'pages;
                }

                match self.harvest(article_url).await {
                    Ok(article) => {
                        self.new_identifiers.insert(article_url.clone());
                        self.harvested.push(article);
                        self.report.harvested += 1;
                    }
                    Err(e) => {
                        tracing::warn!("Skipping article {}: {}", article_url, e);
                        self.report.failed += 1;
                    }
                }
            }

            next = listing.next_page;
        }

        if self.report.status == CrawlStatus::Continue {
            self.report.status = CrawlStatus::Exhausted;
        }

        tracing::info!(
            "{} finished ({}): {} harvested, {} already processed, {} failed, {} pages",
            source.name,
            self.report.status.as_str(),
            self.report.harvested,
            self.report.already_seen,
            self.report.failed,
            self.report.pages
        );

        self.report.status
    }

    async fn harvest(&self, url: &str) -> Result<RawArticle, TidemarkError> {
        let html = self.fetcher.fetch_html(url).await?;
        let article = parse_article(&html, url, self.source, &self.selectors).map_err(|e| {
            TidemarkError::Extract {
                url: url.to_string(),
                message: e.to_string(),
            }
        })?;
        tracing::info!("Harvested article {}", url);
        Ok(article)
    }

    /// Writes the articles, then records their URLs in the crawl state
    pub fn finish(self) -> Result<NewsReport, TidemarkError> {
        let mut report = NewsReport {
            source: self.report,
            data_file: None,
            new_identifiers: 0,
        };

        if self.harvested.is_empty() {
            tracing::info!("{}: no new articles", self.source.name);
            return Ok(report);
        }

        let path = data_file_path(self.data_dir, &self.source.name);
        let json = serde_json::to_string_pretty(&self.harvested)?;
        write_file_atomic(&path, json.as_bytes())?;
        tracing::info!(
            "Wrote {} articles to {}",
            self.harvested.len(),
            path.display()
        );

        report.new_identifiers = self.state.merge_and_save(&self.new_identifiers)?;
        report.data_file = Some(path);
        Ok(report)
    }
}

/// Runs every configured news source in turn
///
/// A source whose results cannot be saved is listed in the report and the
/// remaining sources still run.
pub async fn run_news_collection(config: &Config) -> Result<NewsCollectionReport, TidemarkError> {
    let fetcher = Arc::new(Fetcher::new(&config.crawler)?);
    let mut report = NewsCollectionReport::default();

    for source in &config.news.sources {
        let outcome = match NewsCollector::new(config, source, fetcher.clone()) {
            Ok(mut collector) => {
                collector.crawl().await;
                collector.finish()
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(source_report) => report.sources.push(source_report),
            Err(e) => {
                tracing::error!("{}: could not save collected articles: {}", source.name, e);
                report.failed_sources.push(source.name.clone());
            }
        }
    }

    tracing::info!(
        "News collection finished: {} articles harvested across {} sources",
        report.harvested(),
        config.news.sources.len()
    );
    Ok(report)
}
