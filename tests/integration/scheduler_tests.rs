//! Integration tests for the crawl scheduler
//!
//! These drive `crawler::start` against an in-memory site and check the
//! frontier rules and the event stream end to end.

mod common;

use common::{crawl_config, crawled_urls, drain, FakeSite, SITE};
use reqon_core::crawler::{self, NavigationError};
use reqon_core::events::{CrawlEventKind, PageOutcome};
use reqon_core::{ReqonError, UrlFingerprint};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_url_variants_dispatched_once() {
    let site = Arc::new(
        FakeSite::new()
            .page(SITE, &["/docs", "/docs/", "/docs#intro", "/DOCS/../docs/", "/"])
            .page("https://site.test/docs", &["/", "/docs"]),
    );

    let mut stream = crawler::start(crawl_config(SITE), site.clone()).unwrap();
    let events = drain(&mut stream).await;
    let summary = stream.finish().await.unwrap();

    let calls = site.calls();
    let unique: HashSet<_> = calls
        .iter()
        .map(|u| UrlFingerprint::of(u).unwrap())
        .collect();
    assert_eq!(calls.len(), unique.len(), "duplicate dispatch: {:?}", calls);
    assert_eq!(summary.pages_crawled, calls.len());
    assert_eq!(crawled_urls(&events).len(), calls.len());
}

#[tokio::test]
async fn test_depth_limit() {
    let site = Arc::new(
        FakeSite::new()
            .page(SITE, &["/one"])
            .page("https://site.test/one", &["/two"])
            .page("https://site.test/two", &["/three"])
            .page("https://site.test/three", &[]),
    );

    let mut config = crawl_config(SITE);
    config.max_depth = 2;

    let mut stream = crawler::start(config, site.clone()).unwrap();
    let events = drain(&mut stream).await;
    stream.finish().await.unwrap();

    assert_eq!(
        crawled_urls(&events),
        vec![SITE, "https://site.test/one", "https://site.test/two"]
    );
    assert!(!site.calls().iter().any(|u| u.ends_with("/three")));
}

#[tokio::test]
async fn test_max_pages_bounds_visits() {
    let links: Vec<String> = (0..10).map(|i| format!("/p{}", i)).collect();
    let links: Vec<&str> = links.iter().map(String::as_str).collect();
    let site = Arc::new(FakeSite::new().page(SITE, &links));

    let mut config = crawl_config(SITE);
    config.max_pages = 4;

    let mut stream = crawler::start(config, site.clone()).unwrap();
    drain(&mut stream).await;
    let summary = stream.finish().await.unwrap();

    assert_eq!(site.calls().len(), 4);
    assert_eq!(summary.pages_visited(), 4);
    // Everything the seed linked to was discovered, dispatched or not
    assert_eq!(summary.pages_discovered, 11);
}

#[tokio::test]
async fn test_off_site_links_not_crawled() {
    let site = Arc::new(FakeSite::new().page(
        SITE,
        &[
            "https://other.test/page",
            "https://sub.site.test/page",
            "mailto:someone@site.test",
            "/local",
        ],
    ));

    let mut stream = crawler::start(crawl_config(SITE), site.clone()).unwrap();
    drain(&mut stream).await;
    let summary = stream.finish().await.unwrap();

    assert_eq!(site.calls(), vec![SITE, "https://site.test/local"]);
    assert_eq!(summary.pages_discovered, 2);
}

#[tokio::test]
async fn test_include_and_exclude_patterns() {
    let site = Arc::new(
        FakeSite::new().page(SITE, &["/blog/a", "/blog/drafts/b", "/shop/c"]),
    );

    let mut config = crawl_config(SITE);
    config.include_patterns = vec!["/blog/".to_string()];
    config.exclude_patterns = vec!["drafts".to_string()];

    let mut stream = crawler::start(config, site.clone()).unwrap();
    drain(&mut stream).await;
    stream.finish().await.unwrap();

    // The seed is exempt from the include patterns
    assert_eq!(site.calls(), vec![SITE, "https://site.test/blog/a"]);
}

#[tokio::test]
async fn test_event_order() {
    let site = Arc::new(
        FakeSite::new()
            .page(SITE, &["/a", "/b"])
            .page("https://site.test/a", &["/c"])
            .page("https://site.test/b", &["/c"])
            .page("https://site.test/c", &[]),
    );

    let mut stream = crawler::start(crawl_config(SITE), site).unwrap();
    let events = drain(&mut stream).await;
    stream.finish().await.unwrap();

    assert!(matches!(
        events.first().map(|e| &e.kind),
        Some(CrawlEventKind::ScanStarted { .. })
    ));
    assert!(matches!(
        events.last().map(|e| &e.kind),
        Some(CrawlEventKind::ScanCompleted(_))
    ));
    assert_eq!(
        events
            .iter()
            .filter(|e| e.tag() == "scan_completed")
            .count(),
        1
    );

    let mut discovered_at = HashMap::new();
    let mut last_depth = 0;
    for (i, event) in events.iter().enumerate() {
        match &event.kind {
            CrawlEventKind::PageDiscovered(entry) => {
                assert!(entry.depth >= last_depth, "dispatch went back a level");
                last_depth = entry.depth;
                discovered_at.insert(entry.fingerprint.clone(), i);
            }
            CrawlEventKind::PageCrawled { entry, .. } => {
                let at = discovered_at
                    .get(&entry.fingerprint)
                    .expect("crawled before discovered");
                assert!(*at < i);
            }
            _ => {}
        }
    }
    assert_eq!(discovered_at.len(), 4);
}

#[tokio::test]
async fn test_failed_render_is_visited_and_not_retried() {
    let site = Arc::new(
        FakeSite::new()
            .page(SITE, &["/bad", "/good"])
            .page("https://site.test/good", &["/bad"])
            .failing(
                "https://site.test/bad",
                NavigationError::Connection("reset by peer".to_string()),
            ),
    );

    let mut stream = crawler::start(crawl_config(SITE), site.clone()).unwrap();
    let events = drain(&mut stream).await;
    let summary = stream.finish().await.unwrap();

    let bad_calls = site.calls().iter().filter(|u| u.ends_with("/bad")).count();
    assert_eq!(bad_calls, 1);
    assert_eq!(summary.pages_failed, 1);
    assert_eq!(summary.pages_crawled, 2);

    let failure = events.iter().find_map(|e| match &e.kind {
        CrawlEventKind::PageCrawled {
            outcome: PageOutcome::Failed(error),
            ..
        } => Some(error.clone()),
        _ => None,
    });
    assert_eq!(
        failure,
        Some(NavigationError::Connection("reset by peer".to_string()))
    );
}

#[tokio::test]
async fn test_concurrency_bound() {
    let links: Vec<String> = (0..8).map(|i| format!("/p{}", i)).collect();
    let links: Vec<&str> = links.iter().map(String::as_str).collect();
    let mut site = FakeSite::new().page(SITE, &links);
    for i in 0..8 {
        site = site.slow(
            &format!("https://site.test/p{}", i),
            Duration::from_millis(30),
        );
    }
    let site = Arc::new(site);

    let mut config = crawl_config(SITE);
    config.concurrent_pages = 3;

    let mut stream = crawler::start(config, site.clone()).unwrap();
    drain(&mut stream).await;
    let summary = stream.finish().await.unwrap();

    assert_eq!(summary.pages_crawled, 9);
    assert!(site.peak() <= 3, "peak in flight was {}", site.peak());
    assert!(site.peak() >= 2);
}

#[tokio::test]
async fn test_render_deadline() {
    let site = Arc::new(
        FakeSite::new()
            .page(SITE, &["/stuck"])
            .slow("https://site.test/stuck", Duration::from_secs(30)),
    );

    let mut config = crawl_config(SITE);
    config.page_timeout_ms = 50;

    let mut stream = crawler::start(config, site).unwrap();
    let events = drain(&mut stream).await;
    let summary = stream.finish().await.unwrap();

    assert_eq!(summary.pages_failed, 1);
    assert!(events.iter().any(|e| matches!(
        &e.kind,
        CrawlEventKind::PageCrawled {
            outcome: PageOutcome::Failed(NavigationError::Timeout { after_ms: 50 }),
            ..
        }
    )));
}

#[tokio::test]
async fn test_invalid_config_renders_nothing() {
    let site = Arc::new(FakeSite::new().page(SITE, &[]));

    let mut config = crawl_config(SITE);
    config.exclude_patterns = vec!["(unclosed".to_string()];

    let result = crawler::start(config, site.clone());
    assert!(matches!(result, Err(ReqonError::Config(_))));
    assert!(site.calls().is_empty());
}

#[tokio::test]
async fn test_cancel_fails_pending_renders() {
    let site = Arc::new(FakeSite::new().page(SITE, &["/a"]));

    let mut stream = crawler::start(crawl_config(SITE), site.clone()).unwrap();
    // The scheduler task has not run yet on this runtime
    stream.cancel();

    let events = drain(&mut stream).await;
    let summary = stream.finish().await.unwrap();

    assert!(site.calls().is_empty());
    assert_eq!(summary.pages_crawled, 0);
    assert_eq!(summary.pages_failed, 1);
    assert!(events.iter().any(|e| matches!(
        &e.kind,
        CrawlEventKind::PageCrawled {
            outcome: PageOutcome::Failed(NavigationError::Closed),
            ..
        }
    )));
}

#[tokio::test]
async fn test_redirects_do_not_duplicate_pages() {
    let site = Arc::new(
        FakeSite::new()
            .page(SITE, &["/old", "/new", "/moved", "/away", "/later"])
            .redirect("https://site.test/old", "https://site.test/new")
            .page("https://site.test/new", &[])
            .redirect("https://site.test/moved", "https://site.test/fresh")
            .redirect("https://site.test/away", "https://elsewhere.test/landing")
            .page("https://site.test/later", &["/fresh"])
            .page("https://site.test/fresh", &[]),
    );

    let mut stream = crawler::start(crawl_config(SITE), site.clone()).unwrap();
    let events = drain(&mut stream).await;
    let summary = stream.finish().await.unwrap();

    let mut rendered = HashMap::new();
    let mut redirected = HashMap::new();
    for event in &events {
        match &event.kind {
            CrawlEventKind::PageCrawled {
                outcome: PageOutcome::Rendered(page),
                ..
            } => {
                rendered.insert(page.url.clone(), page.final_url.clone());
            }
            CrawlEventKind::PageCrawled {
                entry,
                outcome: PageOutcome::Redirected { final_url, .. },
            } => {
                redirected.insert(entry.url.clone(), final_url.clone());
            }
            _ => {}
        }
    }

    // /old lands on /new, which has its own entry; /away leaves the site
    assert_eq!(redirected.len(), 2);
    assert_eq!(redirected["https://site.test/old"], "https://site.test/new");
    assert_eq!(
        redirected["https://site.test/away"],
        "https://elsewhere.test/landing"
    );

    // /moved owns /fresh, so the later link to /fresh is never rendered
    assert_eq!(rendered.len(), 4);
    assert_eq!(rendered["https://site.test/moved"], "https://site.test/fresh");
    assert_eq!(rendered["https://site.test/new"], "https://site.test/new");
    assert!(!site.calls().iter().any(|u| u.ends_with("/fresh")));

    assert_eq!(summary.pages_crawled, 4);
    assert_eq!(summary.pages_redirected, 2);
    assert_eq!(summary.pages_failed, 0);
    assert_eq!(summary.pages_discovered, 6);
    assert_eq!(summary.pages_visited(), 6);
}
