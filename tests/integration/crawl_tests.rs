//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end: fetching, scope, robots.txt,
//! depth limits, termination and the files written to the mirror.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use sumi_mirror::config::{Config, CrawlerConfig, OutputConfig, ScanConfig};
use sumi_mirror::crawler::Coordinator;
use sumi_mirror::mirror::map_url;
use sumi_mirror::storage::{lock_storage, shared, SharedStorage, SqliteStorage, Storage};
use sumi_mirror::{run_crawl, SumiError};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling from `start_url`
fn create_test_config(start_url: &str, output_dir: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            start_url: start_url.to_string(),
            max_depth: 3,
            concurrency: 4,
            allowed_hosts: vec!["127.0.0.1".to_string()],
            respect_robots: true,
            user_agent: "TestBot/1.0".to_string(),
            request_delay_ms: 0,
            timeout_secs: 5,
            max_duration_secs: None,
        },
        output: OutputConfig {
            output_dir: output_dir.to_string_lossy().into_owned(),
            database_path: output_dir.join("mirror.db").to_string_lossy().into_owned(),
        },
        scan: ScanConfig::default(),
    }
}

fn memory_storage() -> SharedStorage {
    shared(SqliteStorage::open_in_memory().expect("Failed to open in-memory DB"))
}

/// An HTML response; the body's mime type is what wiremock sends as Content-Type
fn html_page(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into_bytes(), "text/html")
}

async fn mount_page(server: &MockServer, route: &str, body: String, expected: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html_page(body))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_each_url_fetched_at_most_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let pages: Vec<String> = (0..20).map(|i| format!("/p{}", i)).collect();

    // Every page links to every other page and to /common
    let all_links: String = pages
        .iter()
        .chain(std::iter::once(&"/common".to_string()))
        .map(|p| format!(r#"<a href="{}{}">{}</a>"#, base_url, p, p))
        .collect();

    mount_page(&mock_server, "/", format!("<html><body>{}</body></html>", all_links), 1).await;
    for page in &pages {
        mount_page(&mock_server, page, format!("<html><body>{}</body></html>", all_links), 1).await;
    }
    mount_page(&mock_server, "/common", "<p>shared</p>".to_string(), 1).await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = create_test_config(&format!("{}/", base_url), dir.path());
    config.crawler.concurrency = 16;

    let storage = memory_storage();
    let summary = run_crawl(config, Arc::clone(&storage)).await.expect("Crawl failed");

    // seed + 20 pages + /common
    assert_eq!(summary.pages_saved, 22);
    assert_eq!(summary.pages_failed, 0);
    assert!(!summary.cancelled);
    assert_eq!(lock_storage(&storage).count_pages().unwrap(), 22);
}

#[tokio::test]
async fn test_crawl_with_depth_limit() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Chain: / -> /b -> /c, with max_depth = 1
    mount_page(
        &mock_server,
        "/",
        format!(r#"<a href="{}/b">B</a>"#, base_url),
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/b",
        format!(r#"<a href="{}/c">C</a>"#, base_url),
        1,
    )
    .await;
    // Wiremock verifies expect(0) when the mock server drops
    mount_page(&mock_server, "/c", "<p>too deep</p>".to_string(), 0).await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = create_test_config(&format!("{}/", base_url), dir.path());
    config.crawler.max_depth = 1;

    let storage = memory_storage();
    let summary = run_crawl(config, Arc::clone(&storage)).await.expect("Crawl failed");

    assert_eq!(summary.pages_saved, 2);
    // the edge to /c is still recorded
    assert_eq!(summary.links_discovered, 2);
    let storage = lock_storage(&storage);
    assert!(storage.get_page_by_url(&format!("{}/c", base_url)).unwrap().is_none());
    assert_eq!(storage.links_from(&format!("{}/b", base_url)).unwrap().len(), 1);
}

#[tokio::test]
async fn test_out_of_scope_links_recorded_not_fetched() {
    let mock_server = MockServer::start().await;
    let other_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Same machine, but reached through a host name outside the allow-list
    let other_port = Url::parse(&other_server.uri()).unwrap().port().unwrap();
    let external = format!("http://localhost:{}/elsewhere", other_port);

    mount_page(
        &mock_server,
        "/",
        format!(r#"<a href="{}">Elsewhere</a>"#, external),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .respond_with(html_page("<p>external</p>".to_string()))
        .expect(0)
        .mount(&other_server)
        .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&format!("{}/", base_url), dir.path());

    let storage = memory_storage();
    let summary = run_crawl(config, Arc::clone(&storage)).await.expect("Crawl failed");

    assert_eq!(summary.pages_saved, 1);
    assert_eq!(summary.links_discovered, 1);

    let storage = lock_storage(&storage);
    let links = storage.links_from(&format!("{}/", base_url)).unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].to_url, external);
    assert!(storage.get_page_by_url(&external).unwrap().is_none());
}

#[tokio::test]
async fn test_redirect_out_of_scope_not_followed() {
    let mock_server = MockServer::start().await;
    let other_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let other_port = Url::parse(&other_server.uri()).unwrap().port().unwrap();
    let external = format!("http://localhost:{}/secret", other_port);

    mount_page(&mock_server, "/", r#"<a href="/go">Go</a>"#.to_string(), 1).await;
    Mock::given(method("GET"))
        .and(path("/go"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", external.as_str()))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .respond_with(html_page("<p>secret</p>".to_string()))
        .expect(0)
        .mount(&other_server)
        .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&format!("{}/", base_url), dir.path());

    let storage = memory_storage();
    let summary = run_crawl(config, Arc::clone(&storage)).await.expect("Crawl failed");

    assert_eq!(summary.pages_saved, 1);
    assert_eq!(summary.pages_failed, 1);

    let go_url = format!("{}/go", base_url);
    let record = lock_storage(&storage)
        .get_page_by_url(&go_url)
        .unwrap()
        .expect("redirecting page recorded");
    assert_eq!(record.status_code, Some(302));
    assert!(record.local_path.is_none());

    let go = map_url(dir.path(), &Url::parse(&go_url).unwrap()).unwrap();
    assert!(!go.file_path.exists());
}

async fn mount_robots_site(mock_server: &MockServer, private_hits: u64) {
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private"))
        .mount(mock_server)
        .await;
    mount_page(
        mock_server,
        "/",
        format!(
            r#"<a href="{0}/public">Public</a><a href="{0}/private">Private</a>"#,
            base_url
        ),
        1,
    )
    .await;
    mount_page(mock_server, "/public", "<p>public</p>".to_string(), 1).await;
    mount_page(mock_server, "/private", "<p>private</p>".to_string(), private_hits).await;
}

#[tokio::test]
async fn test_robots_txt_respect() {
    let mock_server = MockServer::start().await;
    mount_robots_site(&mock_server, 0).await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&format!("{}/", mock_server.uri()), dir.path());

    let summary = run_crawl(config, memory_storage()).await.expect("Crawl failed");
    assert_eq!(summary.pages_saved, 2);
    assert_eq!(summary.pages_skipped, 1);
}

#[tokio::test]
async fn test_robots_txt_ignored_when_disabled() {
    let mock_server = MockServer::start().await;
    mount_robots_site(&mock_server, 1).await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = create_test_config(&format!("{}/", mock_server.uri()), dir.path());
    config.crawler.respect_robots = false;

    let summary = run_crawl(config, memory_storage()).await.expect("Crawl failed");
    assert_eq!(summary.pages_saved, 3);
    assert_eq!(summary.pages_skipped, 0);
}

#[tokio::test]
async fn test_termination_with_various_worker_counts() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Small site with a cycle and a broken link
    mount_page(
        &mock_server,
        "/",
        format!(r#"<a href="{0}/a">A</a><a href="{0}/b">B</a>"#, base_url),
        3,
    )
    .await;
    mount_page(&mock_server, "/a", format!(r#"<a href="{}/">Home</a>"#, base_url), 3).await;
    mount_page(&mock_server, "/b", format!(r#"<a href="{}/gone">Gone</a>"#, base_url), 3).await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&mock_server)
        .await;

    for workers in [1, 4, 16] {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let mut config = create_test_config(&format!("{}/", base_url), dir.path());
        config.crawler.concurrency = workers;

        let summary = tokio::time::timeout(
            Duration::from_secs(20),
            run_crawl(config, memory_storage()),
        )
        .await
        .unwrap_or_else(|_| panic!("Crawl with {} workers did not terminate", workers))
        .expect("Crawl failed");

        assert_eq!(summary.pages_saved, 3, "workers = {}", workers);
        assert_eq!(summary.pages_failed, 1, "workers = {}", workers);
        assert!(!summary.cancelled);
    }
}

#[tokio::test]
async fn test_saved_files_have_rewritten_links() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        r#"<html><head><link rel="stylesheet" href="/css/site.css"></head><body>
        <a href="/docs/guide#intro">Guide</a>
        <a href="https://example.org/">External</a>
        </body></html>"#
            .to_string(),
        1,
    )
    .await;
    mount_page(&mock_server, "/docs/guide", r#"<a href="../">Up</a>"#.to_string(), 1).await;
    Mock::given(method("GET"))
        .and(path("/css/site.css"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("body { color: black; }", "text/css"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&format!("{}/", base_url), dir.path());

    let summary = run_crawl(config, memory_storage()).await.expect("Crawl failed");
    assert_eq!(summary.pages_saved, 3);

    let base = Url::parse(&base_url).unwrap();
    let home = map_url(dir.path(), &base.join("/").unwrap()).unwrap();
    let guide = map_url(dir.path(), &base.join("/docs/guide").unwrap()).unwrap();
    let css = map_url(dir.path(), &base.join("/css/site.css").unwrap()).unwrap();

    let saved = std::fs::read_to_string(&home.file_path).expect("home page not saved");
    assert!(saved.contains(r#"href="docs/guide/index.html#intro""#), "{}", saved);
    assert!(saved.contains(r#"href="css/site.css""#), "{}", saved);
    assert!(saved.contains(r#"href="https://example.org/""#), "{}", saved);

    let saved_guide = std::fs::read_to_string(&guide.file_path).expect("guide not saved");
    assert!(saved_guide.contains(r#"href="../../index.html""#), "{}", saved_guide);

    // non-HTML bodies are saved byte for byte
    assert_eq!(std::fs::read_to_string(&css.file_path).unwrap(), "body { color: black; }");
}

#[tokio::test]
async fn test_invalid_seed_is_config_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config("not a url", dir.path());

    let result = Coordinator::new(config, memory_storage());
    assert!(matches!(result, Err(SumiError::Config(_))));
}

#[tokio::test]
async fn test_run_record_written_to_database_file() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", "<p>only page</p>".to_string(), 1).await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&format!("{}/", mock_server.uri()), dir.path());
    let db_path = dir.path().join("mirror.db");

    let storage = shared(SqliteStorage::open(&db_path).expect("Failed to open DB"));
    let coordinator = Coordinator::new(config, storage)
        .expect("Failed to create coordinator")
        .with_config_hash("abc123");
    coordinator.run().await.expect("Crawl failed");

    let storage = SqliteStorage::open(&db_path).expect("Failed to reopen DB");
    let run = storage.get_latest_run().unwrap().expect("no run recorded");
    assert_eq!(run.config_hash, "abc123");
    assert_eq!(run.pages_saved, 1);
    assert!(run.finished_at.is_some());
}
