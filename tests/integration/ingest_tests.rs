//! Integration tests for file ingestion
//!
//! These tests drop extraction files into temporary data directories and
//! run the ingestion driver over them, checking row counts and the
//! processed-files index across repeated runs.

use crate::common::{create_test_config, listing_page, post_page, post_path, self_post_entry};
use std::fs;
use tempfile::TempDir;
use tidemark::config::Config;
use tidemark::crawler::run_collection;
use tidemark::ingest::{process_all_new_files, SourceKind};
use tidemark::storage::{SqliteStorage, Storage};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REDDIT_FILE: &str = r#"[
    {
        "id": "t3_one",
        "title": "Security deposit",
        "url": "https://old.reddit.com/r/law/comments/one/",
        "author": "alice",
        "score": "12",
        "num_comments": 3,
        "subreddit": "law",
        "created": "2024-03-01T12:00:00+00:00",
        "created_utc": "1709294400",
        "content_type": "text",
        "body_text": "Landlord kept it.",
        "comments": [
            {"id": "c1", "author": "bob", "body_text": "Small claims.", "replies": [
                {"id": "c2", "body_text": "Agreed.", "replies": []}
            ]},
            "{\"id\": \"c3\", \"body_text\": \"Legacy string comment\"}",
            "not json at all"
        ]
    },
    {
        "title": "No id, skipped"
    },
    {
        "id": "t3_two",
        "title": "Ruling",
        "content_type": "link",
        "content": "https://example.org/ruling",
        "comments": null
    }
]"#;

const NEWS_FILE: &str = r#"[
    {
        "url": "https://apnews.com/article/ruling",
        "title": "Court issues ruling",
        "author": "Reporter",
        "published_date": "2024-03-01T09:30:00Z",
        "source": "AP",
        "tags": ["courts", "housing"]
    },
    {
        "title": "No url, skipped"
    },
    {
        "url": "https://reuters.com/legal/story",
        "title": "Second story",
        "published_date": "March 1st"
    }
]"#;

fn setup(dir: &TempDir) -> Config {
    let config = create_test_config("https://old.reddit.com", dir.path(), 25, 3);
    fs::create_dir_all(&config.paths.reddit_data_dir).unwrap();
    fs::create_dir_all(&config.paths.news_data_dir).unwrap();
    config
}

fn open(config: &Config) -> SqliteStorage {
    SqliteStorage::new(std::path::Path::new(&config.storage.database_path)).unwrap()
}

#[test]
fn test_reddit_ingestion_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let config = setup(&dir);
    fs::write(
        config.paths.reddit_data_dir.join("reddit_20240301_120000.json"),
        REDDIT_FILE,
    )
    .unwrap();

    let first = process_all_new_files(SourceKind::Reddit, &config);
    assert_eq!(first.processed, 1);
    assert!(first.is_success());

    let storage = open(&config);
    assert_eq!(storage.count_posts().unwrap(), 2);
    assert_eq!(storage.count_comments().unwrap(), 3);
    assert_eq!(storage.count_top_level_comments().unwrap(), 2);

    let reply = storage.get_comment("c2").unwrap().unwrap();
    assert_eq!(reply.post_id, "t3_one");
    assert_eq!(reply.parent_comment_id.as_deref(), Some("c1"));

    let index = SourceKind::Reddit.index_store(&config.paths).load();
    assert!(index.contains("reddit_20240301_120000.json"));

    // Nothing new: the file is skipped by the index
    let second = process_all_new_files(SourceKind::Reddit, &config);
    assert_eq!(second.processed, 0);
    assert_eq!(storage.count_posts().unwrap(), 2);
    assert_eq!(storage.count_comments().unwrap(), 3);
}

#[test]
fn test_same_content_in_new_file_adds_no_rows() {
    let dir = TempDir::new().unwrap();
    let config = setup(&dir);
    fs::write(config.paths.reddit_data_dir.join("reddit_1.json"), REDDIT_FILE).unwrap();
    process_all_new_files(SourceKind::Reddit, &config);

    fs::write(config.paths.reddit_data_dir.join("reddit_2.json"), REDDIT_FILE).unwrap();
    let summary = process_all_new_files(SourceKind::Reddit, &config);
    assert_eq!(summary.processed, 1);

    let storage = open(&config);
    assert_eq!(storage.count_posts().unwrap(), 2);
    assert_eq!(storage.count_comments().unwrap(), 3);

    let index = SourceKind::Reddit.index_store(&config.paths).load();
    assert_eq!(index.len(), 2);
}

#[test]
fn test_news_ingestion() {
    let dir = TempDir::new().unwrap();
    let config = setup(&dir);
    fs::write(config.paths.news_data_dir.join("news_1.json"), NEWS_FILE).unwrap();

    let summary = process_all_new_files(SourceKind::News, &config);
    assert!(summary.is_success());
    assert_eq!(summary.processed, 1);

    let storage = open(&config);
    assert_eq!(storage.count_articles().unwrap(), 2);

    let article = storage
        .get_article("https://apnews.com/article/ruling")
        .unwrap()
        .unwrap();
    assert_eq!(article.tags, vec!["courts", "housing"]);
    assert_eq!(article.published_date.as_deref(), Some("2024-03-01T09:30:00+00:00"));

    let unparsed = storage
        .get_article("https://reuters.com/legal/story")
        .unwrap()
        .unwrap();
    assert_eq!(unparsed.published_date.as_deref(), Some("March 1st"));

    process_all_new_files(SourceKind::News, &config);
    assert_eq!(storage.count_articles().unwrap(), 2);
}

#[test]
fn test_bad_file_fails_alone() {
    let dir = TempDir::new().unwrap();
    let config = setup(&dir);
    fs::write(config.paths.reddit_data_dir.join("reddit_1.json"), "{ truncated").unwrap();
    fs::write(config.paths.reddit_data_dir.join("reddit_2.json"), REDDIT_FILE).unwrap();

    let summary = process_all_new_files(SourceKind::Reddit, &config);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 1);
    assert!(!summary.is_success());

    let index = SourceKind::Reddit.index_store(&config.paths).load();
    assert!(!index.contains("reddit_1.json"));
    assert!(index.contains("reddit_2.json"));
}

#[test]
fn test_unreachable_database_leaves_files_unrecorded() {
    let dir = TempDir::new().unwrap();
    let mut config = setup(&dir);
    fs::write(config.paths.reddit_data_dir.join("reddit_1.json"), REDDIT_FILE).unwrap();

    config.storage.database_path = dir
        .path()
        .join("no_such_dir")
        .join("tidemark.db")
        .to_string_lossy()
        .into_owned();

    let summary = process_all_new_files(SourceKind::Reddit, &config);
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.failed, 1);
    assert!(SourceKind::Reddit.index_store(&config.paths).load().is_empty());

    // Once the database is reachable the same file goes through
    let config = setup(&dir);
    let summary = process_all_new_files(SourceKind::Reddit, &config);
    assert_eq!(summary.processed, 1);
    assert_eq!(open(&config).count_posts().unwrap(), 2);
}

#[tokio::test]
async fn test_collected_file_ingests() {
    let server = MockServer::start().await;
    let entries: Vec<String> = ["a", "b"].iter().map(|id| self_post_entry(id)).collect();
    for (at, body) in [
        ("/r/law/new/".to_string(), listing_page(&entries, None)),
        (post_path("a"), post_page("a")),
        (post_path("b"), post_page("b")),
    ] {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
    }

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path(), 25, 3);

    run_collection(&config).await.expect("collection succeeds");
    let summary = process_all_new_files(SourceKind::Reddit, &config);
    assert_eq!(summary.processed, 1);
    assert!(summary.is_success());

    let storage = open(&config);
    assert_eq!(storage.count_posts().unwrap(), 2);
    assert_eq!(storage.count_comments().unwrap(), 4);
    assert_eq!(storage.count_top_level_comments().unwrap(), 2);

    let post = storage.get_post("t3_a").unwrap().unwrap();
    assert_eq!(post.subreddit.as_deref(), Some("law"));
    assert_eq!(post.body_text.as_deref(), Some("Body of a"));
}
