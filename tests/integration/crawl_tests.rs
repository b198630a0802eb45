//! Integration tests for the crawler
//!
//! These tests use wiremock to serve subreddit listings and post pages and
//! run whole collection sessions against them.

use crate::common::{
    create_test_config, link_post_entry, listing_page, post_page, post_path, self_post_entry,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tidemark::content::{ContentClassifier, HttpTextExtractor};
use tidemark::crawler::{run_collection, CrawlSession, Fetcher, CRAWL_STATE_FILE};
use tidemark::state::{CrawlStateStore, CrawlStatus};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_html(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Two listing pages: a, b, c then d, e
async fn mount_two_pages(server: &MockServer) {
    let first: Vec<String> = ["a", "b", "c"].iter().map(|id| self_post_entry(id)).collect();
    let second: Vec<String> = ["d", "e"].iter().map(|id| self_post_entry(id)).collect();

    mount_html(server, "/r/law/new/", listing_page(&first, Some("/r/law/page2/"))).await;
    mount_html(server, "/r/law/page2/", listing_page(&second, None)).await;

    for id in ["a", "b", "c", "d", "e"] {
        mount_html(server, &post_path(id), post_page(id)).await;
    }
}

fn data_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .map(|n| n.starts_with("reddit_"))
                        .unwrap_or(false)
                })
                .collect()
        })
        .unwrap_or_default();
    files.sort();
    files
}

fn read_posts(file: &Path) -> Vec<Value> {
    let content = std::fs::read_to_string(file).expect("data file readable");
    serde_json::from_str(&content).expect("data file is a JSON array")
}

#[tokio::test]
async fn test_full_collection_writes_data_and_state() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path(), 25, 3);

    let report = run_collection(&config).await.expect("collection succeeds");

    assert_eq!(report.sources.len(), 1);
    assert_eq!(report.sources[0].status, CrawlStatus::Exhausted);
    assert_eq!(report.sources[0].pages, 2);
    assert_eq!(report.harvested(), 5);
    assert_eq!(report.new_identifiers, 5);

    let files = data_files(&config.paths.reddit_data_dir);
    assert_eq!(files.len(), 1);
    assert_eq!(report.data_file.as_ref(), Some(&files[0]));

    let posts = read_posts(&files[0]);
    let ids: Vec<&str> = posts.iter().map(|p| p["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["t3_a", "t3_b", "t3_c", "t3_d", "t3_e"]);

    let first = &posts[0];
    assert_eq!(first["subreddit"], "law");
    assert_eq!(first["author"], "u_a");
    assert_eq!(first["score"], 10);
    assert_eq!(first["num_comments"], 2);
    assert_eq!(first["content_type"], "text");
    assert_eq!(first["body_text"], "Body of a");

    let comments = first["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["id"], "t1_a_top");
    assert_eq!(comments[0]["author"], "replier");
    assert_eq!(comments[0]["replies"][0]["id"], "t1_a_reply");

    let state = CrawlStateStore::new(config.paths.reddit_data_dir.join(CRAWL_STATE_FILE));
    let seen = state.load();
    assert_eq!(seen.len(), 5);
    assert!(seen.contains(&format!("{}{}", server.uri(), post_path("c"))));
}

#[tokio::test]
async fn test_rerun_stops_on_seen_posts() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path(), 25, 2);

    run_collection(&config).await.expect("first run succeeds");
    let second = run_collection(&config).await.expect("second run succeeds");

    assert_eq!(second.sources[0].status, CrawlStatus::StopSource);
    assert_eq!(second.sources[0].pages, 1);
    assert_eq!(second.harvested(), 0);
    assert!(second.data_file.is_none());
    assert_eq!(data_files(&config.paths.reddit_data_dir).len(), 1);
}

#[tokio::test]
async fn test_item_cap_then_resume() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path(), 2, 3);

    let first = run_collection(&config).await.expect("first run succeeds");
    assert_eq!(first.sources[0].status, CrawlStatus::CapReached);
    assert_eq!(first.harvested(), 2);

    // a and b are seen, c and d are new, e hits the cap again
    let second = run_collection(&config).await.expect("second run succeeds");
    assert_eq!(second.sources[0].status, CrawlStatus::CapReached);
    assert_eq!(second.sources[0].already_seen, 2);
    assert_eq!(second.harvested(), 2);

    let posts = read_posts(second.data_file.as_ref().unwrap());
    let ids: Vec<&str> = posts.iter().map(|p| p["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["t3_c", "t3_d"]);

    let state = CrawlStateStore::new(config.paths.reddit_data_dir.join(CRAWL_STATE_FILE));
    assert_eq!(state.load().len(), 4);
}

#[tokio::test]
async fn test_failed_post_page_is_skipped_and_retried() {
    let server = MockServer::start().await;
    let entries: Vec<String> = ["a", "b"].iter().map(|id| self_post_entry(id)).collect();
    mount_html(&server, "/r/law/new/", listing_page(&entries, None)).await;
    mount_html(&server, &post_path("a"), post_page("a")).await;
    Mock::given(method("GET"))
        .and(path(post_path("b")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path(), 25, 3);

    let report = run_collection(&config).await.expect("collection succeeds");
    assert_eq!(report.sources[0].harvested, 1);
    assert_eq!(report.sources[0].failed, 1);
    assert_eq!(report.sources[0].status, CrawlStatus::Exhausted);

    let state = CrawlStateStore::new(config.paths.reddit_data_dir.join(CRAWL_STATE_FILE));
    let seen = state.load();
    assert!(seen.contains(&format!("{}{}", server.uri(), post_path("a"))));
    assert!(!seen.contains(&format!("{}{}", server.uri(), post_path("b"))));
}

#[tokio::test]
async fn test_listing_failure_exhausts_source() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/r/law/new/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path(), 25, 3);

    let report = run_collection(&config).await.expect("collection still succeeds");
    assert_eq!(report.sources[0].status, CrawlStatus::Exhausted);
    assert_eq!(report.sources[0].pages, 0);
    assert!(report.data_file.is_none());

    // One attempt plus two retries
    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_transient_listing_error_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/r/law/new/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    let entries = vec![self_post_entry("a")];
    mount_html(&server, "/r/law/new/", listing_page(&entries, None)).await;
    mount_html(&server, &post_path("a"), post_page("a")).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path(), 25, 3);

    let report = run_collection(&config).await.expect("collection succeeds");
    assert_eq!(report.sources[0].status, CrawlStatus::Exhausted);
    assert_eq!(report.sources[0].pages, 1);
    assert_eq!(report.harvested(), 1);
    assert!(report.data_file.is_some());
}

#[tokio::test]
async fn test_link_post_body_from_linked_page() {
    let server = MockServer::start().await;
    let target = format!("{}/article", server.uri());
    let entries = vec![link_post_entry("l", &target)];
    mount_html(&server, "/r/law/new/", listing_page(&entries, None)).await;
    mount_html(
        &server,
        &post_path("l"),
        "<html><body><div class=\"commentarea\"></div></body></html>".to_string(),
    )
    .await;
    mount_html(
        &server,
        "/article",
        "<html><body><nav>Menu</nav><p>Court rules on   tenancy.</p><script>x()</script></body></html>"
            .to_string(),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path(), 25, 3);

    let report = run_collection(&config).await.expect("collection succeeds");
    let posts = read_posts(report.data_file.as_ref().unwrap());

    assert_eq!(posts[0]["content_type"], "link");
    assert_eq!(posts[0]["content"], target.as_str());
    assert_eq!(posts[0]["external_url"], target.as_str());
    assert_eq!(posts[0]["body_text"], "Court rules on tenancy.");
    assert_eq!(posts[0]["comments"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_data_write_failure_leaves_state_untouched() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server.uri(), dir.path(), 25, 3);

    // A regular file where the data directory should be
    let blocked = dir.path().join("blocked");
    std::fs::write(&blocked, "not a directory").unwrap();
    config.paths.reddit_data_dir = blocked;

    let state = CrawlStateStore::new(dir.path().join("state").join(CRAWL_STATE_FILE));
    let fetcher = Arc::new(Fetcher::new(&config.crawler).unwrap());
    let extractor = HttpTextExtractor::new(fetcher.clone(), config.crawler.link_text_max_chars);
    let mut session =
        CrawlSession::new(&config, fetcher, ContentClassifier::new(extractor), &state).unwrap();

    assert_eq!(session.crawl_source("law").await, CrawlStatus::Exhausted);

    assert!(session.finish().is_err());
    assert!(!state.path().exists());
    assert!(state.load().is_empty());
}
