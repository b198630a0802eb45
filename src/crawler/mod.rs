//! Crawler module for harvesting subreddit listings and news sites
//!
//! This module contains the collection side of the pipeline:
//! - Paced HTTP fetching with bounded retries
//! - DOM extraction of listings, post pages and comment areas
//! - The per-subreddit session loop with incremental stopping
//! - Selector-driven news collection sharing the same loop shape

mod fetcher;
mod news;
mod pacer;
mod parser;
mod session;

pub use fetcher::{build_http_client, FetchResult, Fetcher};
pub use news::{
    news_state_path, parse_article, parse_article_links, run_news_collection,
    NewsCollectionReport, NewsCollector, NewsListing, NewsReport, NewsSelectors,
};
pub use pacer::Pacer;
pub use parser::{
    parse_listing, parse_post_page, ExtractError, ListingItem, ListingPage, PostPage,
};
pub use session::{
    listing_url, run_collection, CrawlSession, SessionReport, SourceReport, CRAWL_STATE_FILE,
};
