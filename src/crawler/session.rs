//! Crawl session: the sequential per-subreddit harvest loop
//!
//! A session walks each configured subreddit's listing newest-first, skips
//! posts recorded by earlier runs, and stops a source early once the
//! stopping heuristic sees a run of already-processed posts. Everything
//! harvested is held until the end of the session, when the extraction file
//! is written first and the crawl state second.

use super::fetcher::Fetcher;
use super::parser::{parse_listing, parse_post_page, ListingItem};
use crate::comments::{CommentPayload, CommentTreeBuilder};
use crate::config::{Config, RedditConfig};
use crate::content::{ContentClassifier, HttpTextExtractor, LinkTextExtractor};
use crate::records::raw::RawPost;
use crate::records::Post;
use crate::state::{write_file_atomic, CrawlStateStore, CrawlStatus, StoppingHeuristic};
use crate::TidemarkError;
use chrono::Utc;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// Name of the crawl state file inside the reddit data directory
pub const CRAWL_STATE_FILE: &str = "processed_urls_index.json";

/// What happened to one subreddit or news source
#[derive(Debug, Clone, PartialEq)]
pub struct SourceReport {
    pub source: String,
    pub status: CrawlStatus,
    pub pages: u32,
    pub harvested: usize,
    pub already_seen: usize,
    pub failed: usize,
}

impl SourceReport {
    pub(super) fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            status: CrawlStatus::Continue,
            pages: 0,
            harvested: 0,
            already_seen: 0,
            failed: 0,
        }
    }
}

/// Outcome of a finished session
#[derive(Debug, Clone, Default)]
pub struct SessionReport {
    pub sources: Vec<SourceReport>,
    /// Extraction file written, `None` if nothing new was harvested
    pub data_file: Option<PathBuf>,
    /// Identifiers added to the crawl state
    pub new_identifiers: usize,
}

impl SessionReport {
    pub fn harvested(&self) -> usize {
        self.sources.iter().map(|s| s.harvested).sum()
    }
}

/// Builds the first listing page URL for a subreddit
///
/// `top` listings carry the time filter; the other sorts do not take one.
pub fn listing_url(reddit: &RedditConfig, subreddit: &str) -> String {
    let base = reddit.base_url.trim_end_matches('/');
    if reddit.sort == "top" {
        format!("{}/r/{}/top/?t={}", base, subreddit, reddit.time_filter)
    } else {
        format!("{}/r/{}/{}/", base, subreddit, reddit.sort)
    }
}

/// One harvesting pass over the configured subreddits
pub struct CrawlSession<'a, E: LinkTextExtractor> {
    config: &'a Config,
    fetcher: Arc<Fetcher>,
    classifier: ContentClassifier<E>,
    state: &'a CrawlStateStore,
    heuristic: StoppingHeuristic,
    seen: BTreeSet<String>,
    new_identifiers: BTreeSet<String>,
    harvested: Vec<RawPost>,
    reports: Vec<SourceReport>,
}

impl<'a, E: LinkTextExtractor> CrawlSession<'a, E> {
    /// Creates a session and loads the identifiers recorded by earlier runs
    pub fn new(
        config: &'a Config,
        fetcher: Arc<Fetcher>,
        classifier: ContentClassifier<E>,
        state: &'a CrawlStateStore,
    ) -> Result<Self, TidemarkError> {
        let heuristic = StoppingHeuristic::new(config.crawler.consecutive_seen_threshold)?;
        let seen = state.load();
        tracing::info!(
            "Loaded {} previously processed posts from {}",
            seen.len(),
            state.path().display()
        );
        tracing::debug!(
            "A source stops after {} consecutive processed posts",
            heuristic.threshold()
        );

        Ok(Self {
            config,
            fetcher,
            classifier,
            state,
            heuristic,
            seen,
            new_identifiers: BTreeSet::new(),
            harvested: Vec::new(),
            reports: Vec::new(),
        })
    }

    fn is_seen(&self, identifier: &str) -> bool {
        self.seen.contains(identifier) || self.new_identifiers.contains(identifier)
    }

    /// Traverses one subreddit until a terminal status
    ///
    /// A listing page that cannot be fetched ends the source as
    /// `Exhausted`; a post page that cannot be fetched skips only that post,
    /// which stays unrecorded and is retried by the next run.
    pub async fn crawl_source(&mut self, subreddit: &str) -> CrawlStatus {
        let crawler = &self.config.crawler;
        let max_items = crawler.max_items_per_source as usize;
        let max_pages = crawler.max_pages_per_source;

        let mut report = SourceReport::new(subreddit);
        self.heuristic.reset();

        let mut next = Some(listing_url(&self.config.reddit, subreddit));
        tracing::info!("Crawling r/{}", subreddit);

        'pages: while let Some(url) = next.take() {
            if report.pages >= max_pages {
                tracing::info!("r/{}: page limit of {} reached", subreddit, max_pages);
                break;
            }

            let page_url = match Url::parse(&url) {
                Ok(u) => u,
                Err(e) => {
                    tracing::warn!("r/{}: invalid listing URL {}: {}", subreddit, url, e);
                    break;
                }
            };

            let html = match self.fetcher.fetch_html(&url).await {
                Ok(html) => html,
                Err(e) => {
                    tracing::warn!("r/{}: listing fetch failed: {}", subreddit, e);
                    break;
                }
            };
            report.pages += 1;

            let listing = parse_listing(&html, &page_url);
            for item in &listing.items {
                let seen = self.is_seen(&item.permalink);

                let verdict = CrawlStatus::from(self.heuristic.feed(seen));
                if verdict.is_terminal() {
                    tracing::info!(
                        "r/{}: {} consecutive processed posts, stopping",
                        subreddit,
                        self.heuristic.consecutive_seen()
                    );
                    report.status = verdict;
                    break 'pages;
                }

                if seen {
                    tracing::debug!("Already processed: {}", item.permalink);
                    report.already_seen += 1;
                    continue;
                }

                if report.harvested >= max_items {
                    tracing::info!("r/{}: item cap of {} reached", subreddit, max_items);
                    report.status = CrawlStatus::CapReached;
                    break 'pages;
                }

                match self.harvest(item, subreddit).await {
                    Ok(record) => {
                        self.new_identifiers.insert(item.permalink.clone());
                        self.harvested.push(record);
                        report.harvested += 1;
                    }
                    Err(e) => {
                        tracing::warn!("Skipping post {}: {}", item.permalink, e);
                        report.failed += 1;
                    }
                }
            }

            next = listing.next_page;
        }

        if report.status == CrawlStatus::Continue {
            report.status = CrawlStatus::Exhausted;
        }

        tracing::info!(
            "r/{} finished ({}): {} harvested, {} already processed, {} failed, {} pages",
            subreddit,
            report.status.as_str(),
            report.harvested,
            report.already_seen,
            report.failed,
            report.pages
        );

        let status = report.status;
        self.reports.push(report);
        status
    }

    /// Fetches one post page and assembles its extraction record
    async fn harvest(&self, item: &ListingItem, subreddit: &str) -> Result<RawPost, TidemarkError> {
        let html = self.fetcher.fetch_html(&item.permalink).await?;
        let page = parse_post_page(&html);

        let classification = self
            .classifier
            .classify(&page.signals(item.external_url.clone()))
            .await;

        let post = Post {
            id: item.fullname.clone(),
            title: item.title.clone(),
            url: item.permalink.clone(),
            author: item.author.clone(),
            score: item.score.or(page.score).unwrap_or(0),
            num_comments: item.num_comments.unwrap_or(0),
            subreddit: subreddit.to_string(),
            created: item.created.clone().unwrap_or_default(),
            created_utc: item.created_utc,
            external_url: item.external_url.clone(),
            content_type: classification.content_type,
            content: classification.content,
            body_text: classification.body_text,
        };

        let roots = CommentTreeBuilder::build(&page.comments, &post.id);
        let comments = roots
            .iter()
            .map(|node| CommentPayload::from_node(node).and_then(serde_json::to_value))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(
            "Harvested {} ({}, {} comments)",
            post.id,
            post.content_type.to_db_string(),
            page.comments.len()
        );

        Ok(RawPost::from_post(&post, comments))
    }

    /// Persists the session's results
    ///
    /// The extraction file is written before the crawl state. If it cannot
    /// be written the state is left untouched, so the posts are harvested
    /// again next run instead of being lost.
    pub fn finish(self) -> Result<SessionReport, TidemarkError> {
        let mut report = SessionReport {
            sources: self.reports,
            ..Default::default()
        };

        if self.harvested.is_empty() {
            tracing::info!("No new posts harvested");
            return Ok(report);
        }

        let path = data_file_path(&self.config.paths.reddit_data_dir, "reddit");
        let json = serde_json::to_string_pretty(&self.harvested)?;
        write_file_atomic(&path, json.as_bytes())?;
        tracing::info!("Wrote {} posts to {}", self.harvested.len(), path.display());

        report.new_identifiers = self.state.merge_and_save(&self.new_identifiers)?;
        report.data_file = Some(path);
        Ok(report)
    }
}

/// `<prefix>_<YYYYmmdd_HHMMSS>.json`, suffixed if a file of that name exists
pub(super) fn data_file_path(dir: &Path, prefix: &str) -> PathBuf {
    let stamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
    let mut path = dir.join(format!("{}_{}.json", prefix, stamp));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{}_{}_{}.json", prefix, stamp, n));
        n += 1;
    }
    path
}

/// Runs a full collection pass over every configured subreddit
///
/// Each subreddit ends with its own status; none of them aborts the others.
/// Only a failure to persist the session's results is returned as an error.
pub async fn run_collection(config: &Config) -> Result<SessionReport, TidemarkError> {
    let fetcher = Arc::new(Fetcher::new(&config.crawler)?);
    let extractor = HttpTextExtractor::new(fetcher.clone(), config.crawler.link_text_max_chars);
    let state = CrawlStateStore::new(config.paths.reddit_data_dir.join(CRAWL_STATE_FILE));

    let mut session = CrawlSession::new(config, fetcher, ContentClassifier::new(extractor), &state)?;
    for subreddit in &config.reddit.subreddits {
        session.crawl_source(subreddit).await;
    }

    let report = session.finish()?;
    tracing::info!(
        "Collection finished: {} posts harvested across {} subreddits",
        report.harvested(),
        report.sources.len()
    );
    Ok(report)
}
