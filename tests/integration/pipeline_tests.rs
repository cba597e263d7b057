//! Integration tests for the scan pipeline
//!
//! A pipeline runs against an in-memory site with test detectors, so the
//! findings and scores of every page are known in advance.

mod common;

use async_trait::async_trait;
use common::{crawl_config, FakeSite, SITE};
use reqon_core::config::ScanConfig;
use reqon_core::detector::{Detector, DetectorError, DetectorRegistry, LivePage};
use reqon_core::events::{EventDetail, Level};
use reqon_core::graph::{issue_node_id, EdgeKind, GraphStore, MemoryGraph};
use reqon_core::storage::{ScanStore, SqliteStore};
use reqon_core::{
    Category, ConfigError, EventBus, Finding, JobStatus, PageRecord, ReqonError, ScanPipeline,
    Severity, UrlFingerprint,
};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::broadcast::error::TryRecvError;

/// Reports one critical security issue on `/insecure`
struct FlagsInsecure;

#[async_trait]
impl Detector for FlagsInsecure {
    fn name(&self) -> &'static str {
        "flags_insecure"
    }

    fn category(&self) -> Category {
        Category::Security
    }

    async fn detect(
        &self,
        page: &PageRecord,
        _live: Option<&dyn LivePage>,
    ) -> Result<Vec<Finding>, DetectorError> {
        if !page.url.ends_with("/insecure") {
            return Ok(vec![]);
        }
        Ok(vec![self
            .finding("exposed_secret", Severity::Critical, "Secret In Page")
            .with_description("A secret was found in the page")])
    }
}

struct AlwaysFails;

#[async_trait]
impl Detector for AlwaysFails {
    fn name(&self) -> &'static str {
        "always_fails"
    }

    fn category(&self) -> Category {
        Category::Functional
    }

    async fn detect(
        &self,
        _page: &PageRecord,
        _live: Option<&dyn LivePage>,
    ) -> Result<Vec<Finding>, DetectorError> {
        Err(DetectorError::Data("boom".to_string()))
    }
}

fn registry() -> DetectorRegistry {
    let mut registry = DetectorRegistry::new();
    registry
        .register("flags_insecure", |_| Box::new(FlagsInsecure))
        .register("always_fails", |_| Box::new(AlwaysFails));
    registry
}

fn site() -> Arc<FakeSite> {
    Arc::new(
        FakeSite::new()
            .page(SITE, &["/insecure", "/clean"])
            .page("https://site.test/insecure", &["/"])
            .page("https://site.test/clean", &[]),
    )
}

fn scan_config() -> ScanConfig {
    ScanConfig {
        crawl: crawl_config(SITE),
        scoring: Default::default(),
        detectors: Default::default(),
        output: Default::default(),
    }
}

fn pipeline() -> ScanPipeline {
    ScanPipeline::new(scan_config(), site()).with_registry(registry())
}

#[tokio::test]
async fn test_failing_detector_is_isolated() {
    let report = pipeline().run("job-1").await.unwrap();

    assert_eq!(report.pages_crawled, 3);
    assert_eq!(report.pages_failed, 0);
    assert_eq!(report.issues_found, 1);
    assert_eq!(report.page_scores.len(), 3);
}

#[tokio::test]
async fn test_scores() {
    let report = pipeline().run("job-1").await.unwrap();

    // critical (15) x security (1.5)
    let flagged = 100.0 * 0.95_f64.powf(22.5);

    for page in &report.page_scores {
        if page.url.ends_with("/insecure") {
            assert!((page.score.overall - flagged).abs() < 1e-9);
            assert_eq!(page.score.category(Category::Security), 77.5);
            assert_eq!(page.score.count(Severity::Critical), 1);
        } else {
            assert_eq!(page.score.overall, 100.0);
        }
    }

    let expected = (200.0 + flagged) / 3.0;
    assert!((report.score.overall - expected).abs() < 1e-9);
    assert_eq!(report.score.count(Severity::Critical), 1);
}

#[tokio::test]
async fn test_graph_ingestion_is_idempotent() {
    let graph = Arc::new(MemoryGraph::new());
    let mut pipeline = pipeline().with_graph(graph.clone());

    pipeline.run("job-1").await.unwrap();
    let counts = (graph.page_count(), graph.link_count(), graph.issue_count());
    let first = graph.get_graph("job-1", 1000).await.unwrap();

    pipeline.run("job-1").await.unwrap();
    assert_eq!(
        (graph.page_count(), graph.link_count(), graph.issue_count()),
        counts
    );
    assert_eq!(graph.get_graph("job-1", 1000).await.unwrap(), first);

    assert_eq!(counts, (3, 3, 1));
    let issue_id = issue_node_id("flags_insecure", Category::Security, "Secret In Page");
    let issue = first.node(&issue_id).unwrap();
    assert_eq!(issue.severity, Some(Severity::Critical));
    assert!(first
        .edges_of(EdgeKind::HasIssue)
        .any(|e| e.source == "https://site.test/insecure" && e.target == issue_id));
    assert_eq!(first.edges_of(EdgeKind::LinksTo).count(), 3);
}

#[tokio::test]
async fn test_progress_messages_in_order() {
    let bus = Arc::new(EventBus::new());
    let mut pipeline = pipeline().with_bus(bus.clone());
    let mut rx = bus.subscribe("job-1");

    pipeline.run("job-1").await.unwrap();
    assert!(!bus.is_open("job-1"));

    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(message) => events.push(message),
            Err(TryRecvError::Closed) => break,
            Err(e) => panic!("unexpected receive error: {:?}", e),
        }
    }

    let names: Vec<_> = events.iter().filter_map(|m| m.event()).collect();
    assert_eq!(names.first(), Some(&"scan_started"));
    assert_eq!(names.last(), Some(&"scan_completed"));
    assert_eq!(names.iter().filter(|n| **n == "page_crawled").count(), 3);
    assert_eq!(names.iter().filter(|n| **n == "issue_found").count(), 1);

    let position = |wanted: &str| {
        events.iter().position(|m| match &m.detail {
            Some(EventDetail::PageCrawled { url, .. }) => url == wanted,
            _ => false,
        })
    };
    let crawled = position("https://site.test/insecure").unwrap();
    let issue = events
        .iter()
        .position(|m| matches!(m.detail, Some(EventDetail::IssueFound { .. })))
        .unwrap();
    assert!(crawled < issue);

    match &events.last().unwrap().detail {
        Some(EventDetail::ScanCompleted {
            pages_crawled,
            pages_discovered,
            pages_failed,
            ..
        }) => assert_eq!((*pages_crawled, *pages_discovered, *pages_failed), (3, 3, 0)),
        other => panic!("last message was {:?}", other),
    }
}

#[tokio::test]
async fn test_late_subscriber_sees_nothing() {
    let bus = Arc::new(EventBus::new());
    let mut pipeline = pipeline().with_bus(bus.clone());

    pipeline.run("job-1").await.unwrap();

    let mut late = bus.subscribe("job-1");
    assert!(matches!(late.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_results_are_persisted() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("scan.db");

    let store = SqliteStore::new(&db_path).unwrap();
    let report = pipeline()
        .with_store(Box::new(store))
        .with_config_hash("abc123")
        .run("job-1")
        .await
        .unwrap();

    let store = SqliteStore::new(&db_path).unwrap();
    let job = store.get_job("job-1").unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.config_hash, "abc123");
    assert_eq!(job.pages_crawled, 3);
    assert_eq!(job.overall_score, Some(report.score.overall));
    assert_eq!(store.count_pages("job-1").unwrap(), 3);
    assert_eq!(store.count_issues("job-1").unwrap(), 1);
}

#[tokio::test]
async fn test_screenshots_are_persisted_when_captured() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("scan.db");

    let mut config = scan_config();
    config.crawl.capture_screenshots = true;

    ScanPipeline::new(config, site())
        .with_registry(registry())
        .with_store(Box::new(SqliteStore::new(&db_path).unwrap()))
        .run("job-1")
        .await
        .unwrap();

    let store = SqliteStore::new(&db_path).unwrap();
    let clean = UrlFingerprint::of("https://site.test/clean").unwrap();
    assert_eq!(
        store.get_page_screenshot("job-1", &clean).unwrap(),
        Some(b"https://site.test/clean".to_vec())
    );

    let mut config = scan_config();
    config.crawl.capture_screenshots = false;
    let report = ScanPipeline::new(config, site())
        .with_registry(registry())
        .with_store(Box::new(SqliteStore::new(&db_path).unwrap()))
        .run("job-2")
        .await
        .unwrap();
    assert_eq!(report.pages_crawled, 3);
    let store = SqliteStore::new(&db_path).unwrap();
    assert_eq!(store.get_page_screenshot("job-2", &clean).unwrap(), None);
}

#[tokio::test]
async fn test_invalid_config_fails_job() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("scan.db");

    let mut config = scan_config();
    config.crawl.include_patterns = vec!["[".to_string()];

    let site = site();
    let bus = Arc::new(EventBus::new());
    let mut rx = bus.subscribe("job-1");

    let result = ScanPipeline::new(config, site.clone())
        .with_registry(registry())
        .with_store(Box::new(SqliteStore::new(&db_path).unwrap()))
        .with_bus(bus.clone())
        .run("job-1")
        .await;

    assert!(matches!(
        result,
        Err(ReqonError::Config(ConfigError::InvalidPattern { .. }))
    ));
    assert!(site.calls().is_empty());

    let store = SqliteStore::new(&db_path).unwrap();
    let job = store.get_job("job-1").unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error_message.is_some());

    let message = rx.try_recv().unwrap();
    assert_eq!(message.level, Level::Error);
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Closed)));
}

#[tokio::test]
async fn test_unknown_detector_fails_job() {
    let mut config = scan_config();
    config.detectors.enabled = Some(vec!["flags_insecure".to_string(), "nope".to_string()]);

    let site = site();
    let result = ScanPipeline::new(config, site.clone())
        .with_registry(registry())
        .run("job-1")
        .await;

    assert!(matches!(
        result,
        Err(ReqonError::Config(ConfigError::UnknownDetector(id))) if id == "nope"
    ));
    assert!(site.calls().is_empty());
}

#[tokio::test]
async fn test_disabled_detector_does_not_run() {
    let mut config = scan_config();
    config.detectors.disabled = vec!["flags_insecure".to_string()];

    let report = ScanPipeline::new(config, site())
        .with_registry(registry())
        .run("job-1")
        .await
        .unwrap();

    assert_eq!(report.issues_found, 0);
    assert_eq!(report.score.overall, 100.0);
}
