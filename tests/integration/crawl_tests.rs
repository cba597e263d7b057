//! Integration tests for full scans over HTTP
//!
//! These tests use wiremock to create mock HTTP servers and run the whole
//! pipeline end-to-end with the HTTP renderer and a SQLite store.

use reqon_core::config::{CrawlConfig, ScanConfig};
use reqon_core::crawler::{HttpRenderer, NavigationOptions};
use reqon_core::events::{EventDetail, ProgressMessage};
use reqon_core::graph::{GraphStore, MemoryGraph, NodeKind};
use reqon_core::storage::{ScanStore, SqliteStore};
use reqon_core::{EventBus, JobStatus, ScanPipeline};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::broadcast;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration for the mock server
///
/// The link checker is left out: it would HEAD every link on the server.
fn create_test_config(base_url: &str) -> ScanConfig {
    let mut crawl = CrawlConfig::new(format!("{}/", base_url));
    crawl.max_depth = 2;
    crawl.concurrent_pages = 2;
    crawl.page_timeout_ms = 5_000;
    crawl.wait_after_load_ms = 0;

    let mut config = ScanConfig {
        crawl,
        scoring: Default::default(),
        detectors: Default::default(),
        output: Default::default(),
    };
    config.detectors.disabled = vec!["broken_links".to_string()];
    config
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html; charset=utf-8")
}

/// Mounts a small site with one page hidden by robots.txt
async fn mount_site(server: &MockServer) {
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(&format!(
            r#"<html><head><title>Home page of the mock test site</title>
            <meta name="description" content="A small site used in tests"></head>
            <body><h1>Home</h1>
            <a href="{base}/about">About</a>
            <a href="/missing">Missing</a>
            <a href="/private">Private</a>
            <a href="https://elsewhere.test/">Elsewhere</a>
            </body></html>"#,
            base = base_url
        )))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html(
            r#"<html><head><title>About</title></head>
            <body><h1>About us</h1><p>Lorem ipsum dolor sit amet.</p>
            <a href="/">Home</a></body></html>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(html("<html><head><title>Private</title></head></html>"))
        .mount(server)
        .await;
}

fn drain(rx: &mut broadcast::Receiver<ProgressMessage>) -> Vec<ProgressMessage> {
    let mut messages = Vec::new();
    while let Ok(message) = rx.try_recv() {
        messages.push(message);
    }
    messages
}

#[tokio::test]
async fn test_full_scan_single_site() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    let base_url = mock_server.uri();

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("reqon.db");

    let config = create_test_config(&base_url);
    let renderer = Arc::new(HttpRenderer::new(&NavigationOptions::from(&config.crawl)).unwrap());
    let graph = Arc::new(MemoryGraph::new());
    let bus = Arc::new(EventBus::new());
    let mut progress = bus.subscribe("job");

    let report = ScanPipeline::new(config, renderer)
        .with_store(Box::new(SqliteStore::new(&db_path).unwrap()))
        .with_graph(graph.clone())
        .with_bus(bus.clone())
        .run("job")
        .await
        .expect("scan failed");

    // /, /about and the 404 render; /private is blocked by robots.txt
    assert_eq!(report.pages_crawled, 3);
    assert_eq!(report.pages_failed, 1);
    assert_eq!(report.pages_discovered, 4);
    assert!(report.issues_found > 0);
    assert!(report.score.overall < 100.0);

    let store = SqliteStore::new(&db_path).unwrap();
    let job = store.get_job("job").unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.target_url, format!("{}/", base_url));
    assert_eq!(job.pages_crawled, 3);
    assert_eq!(store.count_pages("job").unwrap(), 3);
    assert_eq!(store.count_issues("job").unwrap(), report.issues_found as u64);

    let messages = drain(&mut progress);
    let issue_on = |detector: &str, suffix: &str| {
        messages.iter().any(|m| match &m.detail {
            Some(EventDetail::IssueFound {
                detector: d, url, ..
            }) => d == detector && url.ends_with(suffix),
            _ => false,
        })
    };
    assert!(issue_on("broken_content", "/about"));
    assert!(issue_on("api_errors", "/missing"));
    assert!(issue_on("meta_tags", "/about"));
    assert!(!messages.iter().any(|m| matches!(
        &m.detail,
        Some(EventDetail::IssueFound { detector, .. }) if detector == "broken_links"
    )));

    let blocked = messages.iter().any(|m| match &m.detail {
        Some(EventDetail::PageCrawled {
            url,
            error: Some(error),
            ..
        }) => url.ends_with("/private") && error.contains("robots.txt"),
        _ => false,
    });
    assert!(blocked);

    let view = graph.get_graph("job", 1000).await.unwrap();
    let about = view.node(&format!("{}/about", base_url)).unwrap();
    assert_eq!(about.kind, NodeKind::Page);
    assert_eq!(about.http_status, Some(200));
    assert!(view.nodes.iter().any(|n| n.kind == NodeKind::Issue));
}

#[tokio::test]
async fn test_robots_ignored_when_disabled() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let mut config = create_test_config(&mock_server.uri());
    config.crawl.respect_robots_txt = false;
    let renderer = Arc::new(HttpRenderer::new(&NavigationOptions::from(&config.crawl)).unwrap());

    let report = ScanPipeline::new(config, renderer)
        .run("job")
        .await
        .expect("scan failed");

    assert_eq!(report.pages_crawled, 4);
    assert_eq!(report.pages_failed, 0);
}

fn redirect(status: u16, location: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).insert_header("location", location)
}

#[tokio::test]
async fn test_redirect_recorded_under_requested_url() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<html><body><a href="/old">Old</a></body></html>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(redirect(301, format!("{}/new", base_url).as_str()))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(html("<html><head><title>New</title></head></html>"))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url);
    let renderer = Arc::new(HttpRenderer::new(&NavigationOptions::from(&config.crawl)).unwrap());
    let bus = Arc::new(EventBus::new());
    let mut progress = bus.subscribe("job");

    let report = ScanPipeline::new(config, renderer)
        .with_bus(bus.clone())
        .run("job")
        .await
        .expect("scan failed");

    let urls: Vec<_> = report.page_scores.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(urls.len(), 2);
    assert!(urls.contains(&format!("{}/old", base_url).as_str()));
    assert_eq!(report.pages_redirected, 0);

    let followed = drain(&mut progress).into_iter().any(|m| match m.detail {
        Some(EventDetail::PageCrawled {
            url,
            redirected_to: Some(to),
            title: Some(title),
            ..
        }) => url.ends_with("/old") && to.ends_with("/new") && title == "New",
        _ => false,
    });
    assert!(followed);
}

#[tokio::test]
async fn test_redirect_onto_known_or_off_site_page_not_analysed() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let port = mock_server.address().port();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><head><title>Home page with redirects</title></head><body>
            <a href="/old">Old</a><a href="/new">New</a><a href="/away">Away</a>
            </body></html>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(redirect(301, format!("{}/new", base_url).as_str()))
        .mount(&mock_server)
        .await;

    // Same server under another host name, which the crawl treats as off-site
    Mock::given(method("GET"))
        .and(path("/away"))
        .respond_with(redirect(
            302,
            format!("http://localhost:{}/landing", port).as_str(),
        ))
        .mount(&mock_server)
        .await;

    for page in ["/new", "/landing"] {
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(html("<html><head><title>Landing</title></head></html>"))
            .mount(&mock_server)
            .await;
    }

    let mut config = create_test_config(&base_url);
    config.crawl.respect_robots_txt = false;
    let renderer = Arc::new(HttpRenderer::new(&NavigationOptions::from(&config.crawl)).unwrap());
    let graph = Arc::new(MemoryGraph::new());

    let report = ScanPipeline::new(config, renderer)
        .with_graph(graph.clone())
        .run("job")
        .await
        .expect("scan failed");

    let mut urls: Vec<_> = report.page_scores.iter().map(|p| p.url.clone()).collect();
    urls.sort();
    assert_eq!(urls, vec![format!("{}/", base_url), format!("{}/new", base_url)]);
    assert_eq!(report.pages_crawled, 2);
    assert_eq!(report.pages_redirected, 2);

    let view = graph.get_graph("job", 1000).await.unwrap();
    assert!(!view.nodes.iter().any(|n| n.id.contains("localhost")));
}

#[tokio::test]
async fn test_unreachable_target_completes_with_failure() {
    let config = create_test_config("http://127.0.0.1:9");
    let renderer = Arc::new(HttpRenderer::new(&NavigationOptions::from(&config.crawl)).unwrap());

    let report = ScanPipeline::new(config, renderer)
        .run("job")
        .await
        .expect("a failed seed still completes the job");

    assert_eq!(report.pages_crawled, 0);
    assert_eq!(report.pages_failed, 1);
    assert_eq!(report.score.overall, 100.0);
}
