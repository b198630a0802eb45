//! Integration tests for stage ordering

use crate::common::{create_test_config, listing_page, post_page, post_path, self_post_entry};
use std::path::Path;
use tempfile::TempDir;
use tidemark::ingest::SourceKind;
use tidemark::pipeline::{run_pipeline, PipelineOutcome};
use tidemark::storage::{SqliteStorage, Storage};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NEWS_FILE: &str = r#"[
    {"url": "https://apnews.com/article/ruling", "title": "Court issues ruling"}
]"#;

async fn mount_subreddit(server: &MockServer) {
    let entries = vec![self_post_entry("a")];
    for (at, body) in [
        ("/r/law/new/".to_string(), listing_page(&entries, None)),
        (post_path("a"), post_page("a")),
    ] {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn test_failed_collection_skips_ingestion() {
    let server = MockServer::start().await;
    mount_subreddit(&server).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server.uri(), dir.path(), 25, 3);
    std::fs::create_dir_all(&config.paths.news_data_dir).unwrap();
    std::fs::write(config.paths.news_data_dir.join("news_1.json"), NEWS_FILE).unwrap();

    // A regular file where the reddit data directory should be
    let blocked = dir.path().join("blocked");
    std::fs::write(&blocked, "not a directory").unwrap();
    config.paths.reddit_data_dir = blocked;

    let kinds = [SourceKind::Reddit, SourceKind::News];
    let outcome = run_pipeline(&config, &kinds, true, true).await;

    assert_eq!(outcome, PipelineOutcome::CollectionFailed);
    assert!(!Path::new(&config.storage.database_path).exists());
    assert!(SourceKind::News.index_store(&config.paths).load().is_empty());
}

#[tokio::test]
async fn test_clean_run_collects_then_ingests() {
    let server = MockServer::start().await;
    mount_subreddit(&server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path(), 25, 3);
    std::fs::create_dir_all(&config.paths.news_data_dir).unwrap();
    std::fs::write(config.paths.news_data_dir.join("news_1.json"), NEWS_FILE).unwrap();

    let kinds = [SourceKind::Reddit, SourceKind::News];
    let outcome = run_pipeline(&config, &kinds, true, true).await;
    assert_eq!(outcome, PipelineOutcome::Completed);

    let storage = SqliteStorage::new(Path::new(&config.storage.database_path)).unwrap();
    assert_eq!(storage.count_posts().unwrap(), 1);
    assert_eq!(storage.count_articles().unwrap(), 1);
}
