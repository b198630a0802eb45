//! Shared fixtures for the integration tests

use std::path::Path;
use tidemark::config::{
    Config, CrawlerConfig, NewsConfig, NewsSourceConfig, PathsConfig, RedditConfig, StorageConfig,
};

/// Creates a test configuration rooted in `dir`, crawling r/law on `base_url`
pub fn create_test_config(base_url: &str, dir: &Path, max_items: u32, threshold: u32) -> Config {
    Config {
        crawler: CrawlerConfig {
            request_delay_ms: 0,
            consecutive_seen_threshold: threshold,
            max_items_per_source: max_items,
            max_pages_per_source: 10,
            max_retries: 2,
            retry_delay_ms: 0,
            link_text_max_chars: 200,
            user_agent: "tidemark-test/1.0".to_string(),
        },
        reddit: RedditConfig {
            base_url: base_url.to_string(),
            subreddits: vec!["law".to_string()],
            sort: "new".to_string(),
            time_filter: "month".to_string(),
        },
        news: NewsConfig::default(),
        storage: StorageConfig {
            database_path: dir.join("tidemark.db").to_string_lossy().into_owned(),
        },
        paths: PathsConfig {
            reddit_data_dir: dir.join("raw_data").join("reddit"),
            news_data_dir: dir.join("raw_data").join("news"),
            state_dir: dir.join("state"),
        },
    }
}

/// Listing entry for a self post with id `id`
pub fn self_post_entry(id: &str) -> String {
    format!(
        r#"<div class="thing link self" data-fullname="t3_{id}">
             <div class="score unvoted" title="10">10</div>
             <a class="title" href="/r/law/comments/{id}/post_{id}/">Post {id}</a>
             <span class="domain">(<a href="/r/law/">self.law</a>)</span>
             <time datetime="2024-03-01T12:00:00+00:00">1 day ago</time>
             <a class="author" href="/user/u_{id}">u_{id}</a>
             <a class="comments" href="/r/law/comments/{id}/post_{id}/">2 comments</a>
           </div>"#
    )
}

/// Listing entry for a link post pointing at `target`
pub fn link_post_entry(id: &str, target: &str) -> String {
    format!(
        r#"<div class="thing link" data-fullname="t3_{id}">
             <div class="score unvoted" title="3">3</div>
             <a class="title" href="{target}">Post {id}</a>
             <span class="domain">(<a href="/domain/example.org/">example.org</a>)</span>
             <a class="author" href="/user/u_{id}">u_{id}</a>
             <a class="comments" href="/r/law/comments/{id}/post_{id}/">comment</a>
           </div>"#
    )
}

/// A listing page with the given entries and optional next-page path
pub fn listing_page(entries: &[String], next: Option<&str>) -> String {
    let next = next
        .map(|href| format!(r#"<span class="next-button"><a href="{}">next</a></span>"#, href))
        .unwrap_or_default();
    format!(
        r#"<html><body><div id="siteTable">{}</div>{}</body></html>"#,
        entries.join("\n"),
        next
    )
}

/// A post page with self-text and a two-level comment thread
pub fn post_page(id: &str) -> String {
    format!(
        r#"<html><body>
             <div class="thing link self" data-fullname="t3_{id}">
               <div class="expando"><div class="md"><p>Body of {id}</p></div></div>
             </div>
             <div class="commentarea"><div class="sitetable nestedlisting">
               <div class="thing comment" data-fullname="t1_{id}_top">
                 <div class="entry"><a class="author">replier</a>
                   <div class="md"><p>Top comment on {id}</p></div></div>
                 <div class="child"><div class="sitetable listing">
                   <div class="thing comment" data-fullname="t1_{id}_reply">
                     <div class="entry"><div class="md"><p>Reply</p></div></div>
                   </div>
                 </div></div>
               </div>
             </div></div>
           </body></html>"#
    )
}

/// Path of a post's comment page on the mock server
pub fn post_path(id: &str) -> String {
    format!("/r/law/comments/{id}/post_{id}/")
}

/// A news source named `wire` whose listing starts at `/news/` on `base_url`
pub fn news_source(base_url: &str, max_articles: u32) -> NewsSourceConfig {
    NewsSourceConfig {
        name: "wire".to_string(),
        listing_url: format!("{}/news/", base_url),
        article_link_selector: "a.headline".to_string(),
        next_page_selector: Some("a.next".to_string()),
        title_selector: "h1".to_string(),
        author_selector: Some(".byline".to_string()),
        date_selector: Some("meta[property='article:published_time']".to_string()),
        description_selector: None,
        body_selector: ".story p".to_string(),
        tag_selector: Some(".tags a".to_string()),
        scrape_body: true,
        max_articles,
        max_pages: 5,
    }
}

/// A news listing linking to the given article slugs
pub fn news_listing(slugs: &[&str], next: Option<&str>) -> String {
    let links: Vec<String> = slugs
        .iter()
        .map(|slug| format!(r#"<a class="headline" href="/news/{slug}">Story {slug}</a>"#))
        .collect();
    let next = next
        .map(|href| format!(r#"<a class="next" href="{}">More</a>"#, href))
        .unwrap_or_default();
    format!(
        r#"<html><body><ul>{}</ul>{}</body></html>"#,
        links.join("\n"),
        next
    )
}

/// An article page for `slug`
pub fn news_article(slug: &str) -> String {
    format!(
        r#"<html><head>
             <meta property="article:published_time" content="2024-03-01T09:30:00Z">
           </head><body>
             <div class="tags"><a href="/courts">Courts</a></div>
             <h1>Story {slug}</h1>
             <div class="byline">Reporter {slug}</div>
             <div class="story"><p>Body of {slug}.</p></div>
           </body></html>"#
    )
}

/// Path of an article on the mock server
pub fn article_path(slug: &str) -> String {
    format!("/news/{slug}")
}
