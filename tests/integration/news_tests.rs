//! Integration tests for news collection
//!
//! A wiremock server plays a news site with a two-page listing; the
//! collector is run against it and its output is fed to ingestion.

use crate::common::{article_path, create_test_config, news_article, news_listing, news_source};
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;
use tidemark::config::Config;
use tidemark::crawler::{news_state_path, run_news_collection};
use tidemark::ingest::{process_all_new_files, SourceKind};
use tidemark::state::{CrawlStateStore, CrawlStatus};
use tidemark::storage::{SqliteStorage, Storage};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_html(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Listing pages: a, b then c
async fn mount_site(server: &MockServer) {
    mount_html(server, "/news/", news_listing(&["a", "b"], Some("/news/page2"))).await;
    mount_html(server, "/news/page2", news_listing(&["c"], None)).await;
    for slug in ["a", "b", "c"] {
        mount_html(server, &article_path(slug), news_article(slug)).await;
    }
}

fn news_config(server: &MockServer, dir: &TempDir, max_articles: u32, threshold: u32) -> Config {
    let mut config = create_test_config(&server.uri(), dir.path(), 25, threshold);
    config.news.sources = vec![news_source(&server.uri(), max_articles)];
    config
}

fn state(config: &Config) -> CrawlStateStore {
    CrawlStateStore::new(news_state_path(&config.paths.news_data_dir, "wire"))
}

fn read_articles(file: &Path) -> Vec<Value> {
    let content = std::fs::read_to_string(file).expect("data file readable");
    serde_json::from_str(&content).expect("data file is a JSON array")
}

#[tokio::test]
async fn test_news_collection_writes_articles_and_state() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let dir = TempDir::new().unwrap();
    let config = news_config(&server, &dir, 10, 3);

    let report = run_news_collection(&config).await.expect("collection runs");
    assert!(report.is_success());
    assert_eq!(report.harvested(), 3);

    let wire = &report.sources[0];
    assert_eq!(wire.source.status, CrawlStatus::Exhausted);
    assert_eq!(wire.source.pages, 2);
    assert_eq!(wire.new_identifiers, 3);

    let file = wire.data_file.as_ref().expect("data file written");
    let name = file.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("wire_"));

    let articles = read_articles(file);
    let urls: Vec<&str> = articles.iter().map(|a| a["url"].as_str().unwrap()).collect();
    assert_eq!(
        urls,
        vec![
            format!("{}/news/a", server.uri()),
            format!("{}/news/b", server.uri()),
            format!("{}/news/c", server.uri()),
        ]
    );

    let first = &articles[0];
    assert_eq!(first["title"], "Story a");
    assert_eq!(first["author"], "Reporter a");
    assert_eq!(first["body"], "Body of a.");
    assert_eq!(first["source"], "wire");
    assert_eq!(first["published_date"], "2024-03-01T09:30:00+00:00");
    assert_eq!(first["tags"][0], "Courts");
    assert!(first["scraped_at"].is_string());

    let seen = state(&config).load();
    assert_eq!(seen.len(), 3);
    assert!(seen.contains(&format!("{}/news/b", server.uri())));
}

#[tokio::test]
async fn test_news_rerun_stops_on_seen_articles() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let dir = TempDir::new().unwrap();
    let config = news_config(&server, &dir, 10, 2);

    run_news_collection(&config).await.expect("first run");
    let second = run_news_collection(&config).await.expect("second run");

    let wire = &second.sources[0];
    assert_eq!(wire.source.status, CrawlStatus::StopSource);
    assert_eq!(wire.source.pages, 1);
    assert_eq!(second.harvested(), 0);
    assert!(wire.data_file.is_none());
}

#[tokio::test]
async fn test_article_cap_then_resume() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let dir = TempDir::new().unwrap();
    let config = news_config(&server, &dir, 2, 3);

    let first = run_news_collection(&config).await.expect("first run");
    assert_eq!(first.sources[0].source.status, CrawlStatus::CapReached);
    assert_eq!(first.harvested(), 2);

    let second = run_news_collection(&config).await.expect("second run");
    let wire = &second.sources[0];
    assert_eq!(wire.source.status, CrawlStatus::Exhausted);
    assert_eq!(wire.source.already_seen, 2);
    assert_eq!(wire.source.harvested, 1);

    let articles = read_articles(wire.data_file.as_ref().unwrap());
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0]["title"], "Story c");
    assert_eq!(state(&config).load().len(), 3);
}

#[tokio::test]
async fn test_failed_article_is_left_for_next_run() {
    let server = MockServer::start().await;
    mount_html(&server, "/news/", news_listing(&["a", "b", "c"], None)).await;
    mount_html(&server, &article_path("a"), news_article("a")).await;
    Mock::given(method("GET"))
        .and(path(article_path("b")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_html(
        &server,
        &article_path("c"),
        "<html><body><p>No headline here</p></body></html>".to_string(),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = news_config(&server, &dir, 10, 3);

    let report = run_news_collection(&config).await.expect("collection runs");
    let wire = &report.sources[0];
    assert_eq!(wire.source.harvested, 1);
    assert_eq!(wire.source.failed, 2);

    let seen = state(&config).load();
    assert_eq!(seen.len(), 1);
    assert!(seen.contains(&format!("{}/news/a", server.uri())));
}

#[tokio::test]
async fn test_collected_articles_ingest() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let dir = TempDir::new().unwrap();
    let config = news_config(&server, &dir, 10, 3);

    run_news_collection(&config).await.expect("collection runs");

    // The crawl state file sits beside the data file and is not ingested
    let summary = process_all_new_files(SourceKind::News, &config);
    assert!(summary.is_success());
    assert_eq!(summary.processed, 1);

    let storage = SqliteStorage::new(Path::new(&config.storage.database_path)).unwrap();
    assert_eq!(storage.count_articles().unwrap(), 3);

    let article = storage
        .get_article(&format!("{}/news/c", server.uri()))
        .unwrap()
        .unwrap();
    assert_eq!(article.title.as_deref(), Some("Story c"));
    assert_eq!(article.source.as_deref(), Some("wire"));
    assert_eq!(article.tags, vec!["Courts"]);
    assert_eq!(article.published_date.as_deref(), Some("2024-03-01T09:30:00+00:00"));
}
