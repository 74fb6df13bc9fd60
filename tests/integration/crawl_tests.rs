//! Integration tests for the crawl frontier
//!
//! These tests use wiremock to create mock HTTP servers and drive full runs
//! end-to-end through the HTTP fetcher, robots checker and SQLite store.

use crawl_frontier::config::{CrawlConfig, CrawlType};
use crawl_frontier::crawler::{FetchBackend, Frontier, HtmlLinkExtractor, HttpFetcher};
use crawl_frontier::storage::{CrawlStore, RunStatus, SqliteStore};
use crawl_frontier::{EntryStatus, StopReason};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(crawl_type: CrawlType) -> CrawlConfig {
    CrawlConfig {
        crawl_type,
        default_crawl_delay: 0,
        max_retries: 1,
        user_agent: "TestBot/1.0".to_string(),
        ..CrawlConfig::default()
    }
}

fn create_frontier(store: Arc<SqliteStore>, config: &CrawlConfig) -> Frontier {
    let fetcher = FetchBackend::Http(HttpFetcher::new(config).expect("Failed to build client"));
    Frontier::new(store, Arc::new(fetcher), Arc::new(HtmlLinkExtractor::new()))
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, page: &str, html: &str, expected_hits: u64) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html)
                .insert_header("content-type", "text/html"),
        )
        .expect(expected_hits)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_single_level_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_page(
        &server,
        "/",
        r#"<html><body>
            <a href="/a">A</a>
            <a href="/b?utm_source=newsletter">B</a>
            <a href="https://other.com/c">C</a>
        </body></html>"#,
        1,
    )
    .await;
    mount_page(&server, "/a", r#"<a href="/deeper">Deeper</a>"#, 1).await;
    mount_page(&server, "/b", "<html></html>", 1).await;
    mount_page(&server, "/deeper", "", 0).await;

    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let config = test_config(CrawlType::SingleLevel);
    let frontier = create_frontier(store.clone(), &config);

    let report = frontier
        .start_run("level", &[format!("{}/", base)], &config)
        .await
        .expect("Crawl should succeed");

    assert_eq!(report.stop_reason, StopReason::QueueExhausted);
    assert_eq!(report.fetched, 3);
    assert_eq!(report.stats.complete, 3);
    assert_eq!(report.stats.total(), 3);

    let entries = store.entries("level").unwrap();
    let urls: Vec<_> = entries.iter().map(|e| e.url.as_str()).collect();
    assert!(urls.contains(&format!("{}/b", base).as_str()));
    assert!(!urls.iter().any(|u| u.contains("other.com")));
    assert!(entries
        .iter()
        .all(|e| e.depth <= 1 && e.status == EntryStatus::Complete));

    let run = store.get_run("level").unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert!(run.finished_at.is_some());
}

#[tokio::test]
async fn test_single_page_does_not_follow_links() {
    let server = MockServer::start().await;
    mount_robots(&server, "").await;
    mount_page(&server, "/", r#"<a href="/a">A</a>"#, 1).await;
    mount_page(&server, "/a", "", 0).await;

    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let config = test_config(CrawlType::SinglePage);
    let report = create_frontier(store.clone(), &config)
        .start_run("page", &[server.uri()], &config)
        .await
        .unwrap();

    assert_eq!(report.fetched, 1);
    assert_eq!(store.stats("page").unwrap().total(), 1);
}

#[tokio::test]
async fn test_domain_crawl_follows_depth() {
    let server = MockServer::start().await;
    mount_robots(&server, "").await;
    mount_page(&server, "/", r#"<a href="/one">1</a>"#, 1).await;
    mount_page(&server, "/one", r#"<a href="/two">2</a><a href="/">home</a>"#, 1).await;
    mount_page(&server, "/two", r#"<a href="https://elsewhere.org/">x</a>"#, 1).await;

    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let config = test_config(CrawlType::Domain);
    let report = create_frontier(store.clone(), &config)
        .start_run("domain", &[server.uri()], &config)
        .await
        .unwrap();

    assert_eq!(report.fetched, 3);
    let two = store
        .get_entry("domain", &format!("{}/two", server.uri()))
        .unwrap()
        .unwrap();
    assert_eq!(two.depth, 2);
    assert_eq!(store.stats("domain").unwrap().total(), 3);
}

#[tokio::test]
async fn test_robots_disallow_skips_without_fetch() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /private").await;
    mount_page(
        &server,
        "/",
        r#"<a href="/private/secret">S</a><a href="/public">P</a>"#,
        1,
    )
    .await;
    mount_page(&server, "/private/secret", "", 0).await;
    mount_page(&server, "/public", "", 1).await;

    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let config = test_config(CrawlType::SingleLevel);
    let report = create_frontier(store.clone(), &config)
        .start_run("robots", &[server.uri()], &config)
        .await
        .unwrap();

    assert_eq!(report.fetched, 2);
    assert_eq!(report.skipped, 1);

    // Skipped entries are complete, never errored
    let secret = store
        .get_entry("robots", &format!("{}/private/secret", server.uri()))
        .unwrap()
        .unwrap();
    assert_eq!(secret.status, EntryStatus::Complete);
    assert_eq!(secret.retry_count, 0);
}

#[tokio::test]
async fn test_robots_ignored_when_disabled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /"))
        .expect(0)
        .mount(&server)
        .await;
    mount_page(&server, "/", "", 1).await;

    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let config = CrawlConfig {
        respect_robots: false,
        ..test_config(CrawlType::SinglePage)
    };
    let report = create_frontier(store, &config)
        .start_run("no-robots", &[server.uri()], &config)
        .await
        .unwrap();

    assert_eq!(report.fetched, 1);
}

#[tokio::test]
async fn test_unreachable_robots_fails_open_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_page(&server, "/", "", 1).await;

    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let config = test_config(CrawlType::SinglePage);
    let report = create_frontier(store, &config)
        .start_run("open", &[server.uri()], &config)
        .await
        .unwrap();

    assert_eq!(report.fetched, 1);
    assert_eq!(report.stats.complete, 1);
}

#[tokio::test]
async fn test_unreachable_robots_fail_closed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_page(&server, "/", "", 0).await;

    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let config = CrawlConfig {
        robots_fail_open: false,
        max_retries: 0,
        ..test_config(CrawlType::SinglePage)
    };
    let report = create_frontier(store.clone(), &config)
        .start_run("closed", &[server.uri()], &config)
        .await
        .unwrap();

    assert_eq!(report.fetched, 0);
    assert_eq!(report.stats.error, 1);

    let entry = store
        .get_entry("closed", &format!("{}/", server.uri()))
        .unwrap()
        .unwrap();
    assert!(entry.error_message.unwrap().contains("robots.txt"));
}

#[tokio::test]
async fn test_fail_closed_retries_ask_for_robots_again() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;
    mount_page(&server, "/", "", 0).await;

    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let config = CrawlConfig {
        robots_fail_open: false,
        max_retries: 2,
        ..test_config(CrawlType::SinglePage)
    };
    let report = create_frontier(store.clone(), &config)
        .start_run("closed-retries", &[server.uri()], &config)
        .await
        .unwrap();

    assert_eq!(report.failed, 3);
    let entry = store
        .get_entry("closed-retries", &format!("{}/", server.uri()))
        .unwrap()
        .unwrap();
    assert_eq!(entry.status, EntryStatus::Error);
    assert_eq!(entry.retry_count, 3);
}

#[tokio::test]
async fn test_server_errors_exhaust_retries() {
    let server = MockServer::start().await;
    mount_robots(&server, "").await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let config = CrawlConfig {
        max_retries: 2,
        ..test_config(CrawlType::SinglePage)
    };
    let url = format!("{}/broken", server.uri());
    let report = create_frontier(store.clone(), &config)
        .start_run("retries", &[url.clone()], &config)
        .await
        .unwrap();

    assert_eq!(report.stop_reason, StopReason::QueueExhausted);
    assert_eq!(report.failed, 3);

    let entry = store.get_entry("retries", &url).unwrap().unwrap();
    assert_eq!(entry.status, EntryStatus::Error);
    assert_eq!(entry.retry_count, 3);
    assert_eq!(entry.error_message.as_deref(), Some("HTTP status 500"));
}

#[tokio::test]
async fn test_rate_limit_spaces_requests() {
    let server = MockServer::start().await;
    mount_robots(&server, "").await;
    mount_page(&server, "/", r#"<a href="/a">A</a><a href="/b">B</a>"#, 1).await;
    mount_page(&server, "/a", "", 1).await;
    mount_page(&server, "/b", "", 1).await;

    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let config = CrawlConfig {
        default_crawl_delay: 300,
        ..test_config(CrawlType::SingleLevel)
    };

    let started = Instant::now();
    let report = create_frontier(store, &config)
        .start_run("paced", &[server.uri()], &config)
        .await
        .unwrap();

    assert_eq!(report.fetched, 3);
    // Three requests to one domain need at least two full gaps
    assert!(started.elapsed() >= Duration::from_millis(600));
}

#[tokio::test]
async fn test_max_pages_limits_run() {
    let server = MockServer::start().await;
    mount_robots(&server, "").await;

    let mut html = String::new();
    for i in 0..10 {
        html.push_str(&format!(r#"<a href="/p{}">p</a>"#, i));
    }
    mount_page(&server, "/", &html, 1).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;

    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let config = CrawlConfig {
        max_pages: 4,
        batch_size: 2,
        ..test_config(CrawlType::Domain)
    };
    let report = create_frontier(store.clone(), &config)
        .start_run("limited", &[server.uri()], &config)
        .await
        .unwrap();

    assert_eq!(report.stop_reason, StopReason::PageLimit);
    assert_eq!(report.stats.complete, 4);
    assert_eq!(report.stats.in_progress, 0);
    assert_eq!(report.stats.pending, 7);
}

#[tokio::test]
async fn test_resume_after_crash() {
    let server = MockServer::start().await;
    mount_robots(&server, "").await;
    mount_page(&server, "/", "", 1).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("frontier.db");
    let seed = format!("{}/", server.uri());

    // A previous process claimed the seed and died mid-fetch
    {
        let store = SqliteStore::open(&db_path).unwrap();
        store.begin_run("crashed", "old-config").unwrap();
        store.enqueue("crashed", &seed, 0).unwrap();
        assert_eq!(store.claim_batch("crashed", 1).unwrap().len(), 1);
    }

    let store = Arc::new(SqliteStore::open(&db_path).unwrap());
    assert_eq!(store.stats("crashed").unwrap().in_progress, 1);

    let config = test_config(CrawlType::SinglePage);
    let report = create_frontier(store.clone(), &config)
        .start_run("crashed", &[seed.clone()], &config)
        .await
        .unwrap();

    assert_eq!(report.fetched, 1);
    assert_eq!(report.stats.complete, 1);
    assert_eq!(report.stats.total(), 1);
    assert_ne!(
        store.get_run("crashed").unwrap().unwrap().config_hash,
        "old-config"
    );
}

#[tokio::test]
async fn test_cancel_then_resume() {
    let server = MockServer::start().await;
    mount_robots(&server, "").await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<a href="/a">A</a><a href="/b">B</a>"#)
                .set_delay(Duration::from_millis(800)),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/a", "", 1).await;
    mount_page(&server, "/b", "", 1).await;

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::open(&dir.path().join("frontier.db")).unwrap());
    let config = test_config(CrawlType::SingleLevel);

    let token = CancellationToken::new();
    let frontier = create_frontier(store.clone(), &config).with_cancellation(token.clone());
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        token.cancel();
    });

    let report = frontier
        .start_run("paused", &[server.uri()], &config)
        .await
        .unwrap();

    // The in-flight fetch finished; nothing new was claimed
    assert_eq!(report.stop_reason, StopReason::Cancelled);
    assert_eq!(report.stats.complete, 1);
    assert_eq!(report.stats.pending, 2);
    assert_eq!(
        store.get_run("paused").unwrap().unwrap().status,
        RunStatus::Interrupted
    );

    let report = create_frontier(store.clone(), &config)
        .start_run("paused", &[], &config)
        .await
        .unwrap();

    assert_eq!(report.stop_reason, StopReason::QueueExhausted);
    assert_eq!(report.fetched, 2);
    assert_eq!(report.stats.complete, 3);
}

#[tokio::test]
async fn test_runs_share_store_independently() {
    let server = MockServer::start().await;
    mount_robots(&server, "").await;
    mount_page(&server, "/", "", 2).await;

    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let config = test_config(CrawlType::SinglePage);

    for run_id in ["first", "second"] {
        let report = create_frontier(store.clone(), &config)
            .start_run(run_id, &[server.uri()], &config)
            .await
            .unwrap();
        assert_eq!(report.fetched, 1);
    }

    assert_eq!(store.list_runs().unwrap().len(), 2);
}
