//! Scan pipeline
//!
//! Wires one job end to end: the scheduler crawls, every rendered page goes
//! through the detector engine and the score engine, results are persisted
//! and ingested into the graph, and progress is published on the event bus.
//!
//! Persistence and graph ingestion are best-effort. Their failures are
//! logged and the scan carries on; only configuration errors and renderer
//! start-up failures fail a job.

use crate::config::{self, ScanConfig};
use crate::crawler::{self, Renderer};
use crate::detector::{DetectorEngine, DetectorRegistry};
use crate::events::{CrawlEventKind, CrawlSummary, EventBus, PageOutcome, ProgressMessage};
use crate::graph::GraphStore;
use crate::model::{Finding, PageRecord};
use crate::score::{ScoreEngine, ScoreResult};
use crate::storage::{ScanStore, StorageResult};
use crate::Result;
use serde::Serialize;
use std::sync::Arc;

/// Score of one page in a finished job
#[derive(Debug, Clone, Serialize)]
pub struct PageScore {
    pub url: String,
    pub score: ScoreResult,
}

/// Outcome of a finished job
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub job_id: String,
    pub pages_crawled: usize,
    pub pages_failed: usize,
    /// Renders that landed on an already known or out-of-scope page
    pub pages_redirected: usize,
    pub pages_discovered: usize,
    pub issues_found: usize,
    pub page_scores: Vec<PageScore>,
    pub score: ScoreResult,
}

/// Runs scan jobs against one configuration
pub struct ScanPipeline {
    config: ScanConfig,
    config_hash: String,
    renderer: Arc<dyn Renderer>,
    registry: DetectorRegistry,
    scoring: ScoreEngine,
    store: Option<Box<dyn ScanStore>>,
    graph: Option<Arc<dyn GraphStore>>,
    bus: Arc<EventBus>,
}

impl ScanPipeline {
    /// Creates a pipeline with the built-in detectors, no persistence, no
    /// graph, and a private event bus
    pub fn new(config: ScanConfig, renderer: Arc<dyn Renderer>) -> Self {
        let scoring = ScoreEngine::new(config.scoring.clone());
        Self {
            config,
            config_hash: String::new(),
            renderer,
            registry: DetectorRegistry::with_builtin(),
            scoring,
            store: None,
            graph: None,
            bus: Arc::new(EventBus::new()),
        }
    }

    pub fn with_store(mut self, store: Box<dyn ScanStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_graph(mut self, graph: Arc<dyn GraphStore>) -> Self {
        self.graph = Some(graph);
        self
    }

    pub fn with_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = bus;
        self
    }

    pub fn with_registry(mut self, registry: DetectorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Hash of the configuration file, recorded with the job
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = hash.into();
        self
    }

    pub fn bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.bus)
    }

    /// Runs one job to completion
    ///
    /// The job's bus channel is opened before the first message and closed
    /// after `scan_completed`, or after the failure message when the job
    /// cannot start.
    pub async fn run(&mut self, job_id: &str) -> Result<ScanReport> {
        let target = self.config.crawl.target_url.clone();
        let hash = self.config_hash.clone();
        self.persist("create job", |store| store.create_job(job_id, &target, &hash));
        self.bus.open(job_id);

        let started = self.prepare().and_then(|engine| {
            let stream = crawler::start(self.config.crawl.clone(), Arc::clone(&self.renderer))?;
            Ok((engine, stream))
        });
        let (engine, mut stream) = match started {
            Ok(started) => started,
            Err(e) => {
                tracing::error!("Job {} failed to start: {}", job_id, e);
                let reason = e.to_string();
                self.persist("fail job", |store| store.fail_job(job_id, &reason));
                self.bus
                    .publish(job_id, ProgressMessage::error(format!("Scan failed: {}", e)));
                self.bus.close(job_id);
                return Err(e);
            }
        };
        self.persist("start job", |store| store.start_job(job_id));
        tracing::info!(
            "Job {} running {} detectors: {:?}",
            job_id,
            engine.len(),
            engine.detector_names()
        );

        let mut page_scores = Vec::new();
        let mut issues_found = 0;
        let mut summary = CrawlSummary::default();

        while let Some(event) = stream.next().await {
            match &event.kind {
                CrawlEventKind::PageCrawled {
                    outcome: PageOutcome::Rendered(page),
                    ..
                } => {
                    let (findings, score) = self.process_page(job_id, page, &engine).await;
                    if let Some(message) = ProgressMessage::from_crawl_event(&event) {
                        self.bus.publish(job_id, message);
                    }
                    for finding in &findings {
                        self.bus
                            .publish(job_id, ProgressMessage::issue_found(&page.url, finding));
                    }
                    issues_found += findings.len();
                    page_scores.push(PageScore {
                        url: page.url.clone(),
                        score,
                    });
                }
                CrawlEventKind::ScanCompleted(done) => summary = *done,
                _ => {
                    if let Some(message) = ProgressMessage::from_crawl_event(&event) {
                        self.bus.publish(job_id, message);
                    }
                }
            }
        }

        let finished = stream.finish().await;
        if let Err(e) = &finished {
            tracing::warn!("Crawl task for job {} ended abnormally: {}", job_id, e);
        }
        let summary = finished.unwrap_or(summary);

        let scores: Vec<ScoreResult> = page_scores.iter().map(|p| p.score.clone()).collect();
        let score = self.scoring.score_job(&scores);

        let overall = score.overall;
        self.persist("complete job", |store| {
            store.complete_job(job_id, summary.pages_crawled, overall)
        });
        self.bus.publish(
            job_id,
            ProgressMessage::scan_completed(
                summary.pages_crawled,
                summary.pages_discovered,
                summary.pages_failed,
                overall,
            ),
        );
        self.bus.close(job_id);

        tracing::info!(
            "Job {} completed: {} pages, {} issues, score {:.1}",
            job_id,
            summary.pages_crawled,
            issues_found,
            overall
        );

        Ok(ScanReport {
            job_id: job_id.to_string(),
            pages_crawled: summary.pages_crawled,
            pages_failed: summary.pages_failed,
            pages_redirected: summary.pages_redirected,
            pages_discovered: summary.pages_discovered,
            issues_found,
            page_scores,
            score,
        })
    }

    /// Validates the configuration and builds the detector engine
    ///
    /// Detector identifiers are checked against this pipeline's registry,
    /// which may hold more than the built-in set. Link checks identify as
    /// the crawler unless configured otherwise.
    fn prepare(&self) -> Result<DetectorEngine> {
        config::validate_crawl_config(&self.config.crawl)?;
        config::validate_score_weights(&self.config.scoring)?;

        let mut detectors = self.config.detectors.clone();
        if detectors.link_check_user_agent.is_none() {
            detectors.link_check_user_agent = Some(self.config.crawl.user_agent.clone());
        }
        Ok(self.registry.build(&detectors)?)
    }

    /// Detects, scores, persists, and ingests one rendered page
    async fn process_page(
        &mut self,
        job_id: &str,
        page: &PageRecord,
        engine: &DetectorEngine,
    ) -> (Vec<Finding>, ScoreResult) {
        let findings = engine.run_all(page, None).await;
        let score = self.scoring.score_page(&findings);

        let overall = score.overall;
        let page_id = self.persist("record page", |store| store.record_page(job_id, page));
        if let Some(page_id) = page_id {
            self.persist("record page score", |store| {
                store.record_page_score(page_id, overall)
            });
            self.persist("record issues", |store| {
                store.record_issues(job_id, page_id, &findings)
            });
        }

        if let Some(graph) = &self.graph {
            let ingested = async {
                graph.upsert_page(job_id, page, &page.links).await?;
                graph.upsert_issues(&page.url, &findings).await
            }
            .await;
            if let Err(e) = ingested {
                tracing::warn!("Graph ingestion failed for {}: {}", page.url, e);
            }
        }

        (findings, score)
    }

    /// Runs a store operation if a store is attached, logging failures
    fn persist<T>(
        &mut self,
        what: &str,
        op: impl FnOnce(&mut dyn ScanStore) -> StorageResult<T>,
    ) -> Option<T> {
        let store = self.store.as_deref_mut()?;
        match op(store) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Failed to {}: {}", what, e);
                None
            }
        }
    }
}
