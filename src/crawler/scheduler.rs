//! Breadth-first crawl scheduler
//!
//! This module handles:
//! - Seeding the frontier and dispatching it in same-depth batches
//! - Bounding concurrency with render slots and a per-render deadline
//! - Folding discovered links back into the frontier between completions
//! - Emitting the ordered event stream for the job

use crate::config::CrawlConfig;
use crate::crawler::frontier::Frontier;
use crate::crawler::renderer::{NavigationError, NavigationOptions, RenderSlots, RenderedPage, Renderer};
use crate::events::{CrawlEvent, CrawlEventKind, CrawlSummary, PageOutcome};
use crate::model::FrontierEntry;
use crate::state::FrontierState;
use crate::url::UrlFilter;
use crate::{ReqonError, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

/// Events buffered between the scheduler and its consumer
const EVENT_BUFFER: usize = 64;

/// Drives one crawl job from seed to exhaustion
///
/// Owns the job's frontier outright; nothing else reads or writes it.
pub struct Scheduler {
    config: CrawlConfig,
    options: Arc<NavigationOptions>,
    frontier: Frontier,
    renderer: Arc<dyn Renderer>,
    slots: RenderSlots,
    events: mpsc::Sender<CrawlEvent>,
    redirected: usize,
}

impl Scheduler {
    /// Creates a scheduler after validating the configuration
    ///
    /// Invalid configuration fails here, before any render call.
    ///
    /// # Arguments
    ///
    /// * `config` - Crawl settings for this job
    /// * `renderer` - Shared renderer; called at most `concurrent_pages`
    ///   times at once
    /// * `events` - Sink for the job's ordered events
    ///
    /// # Returns
    ///
    /// * `Ok(Scheduler)` - Ready to [`run`](Scheduler::run)
    /// * `Err(ReqonError::Config)` - The configuration or a pattern is invalid
    pub fn new(
        config: CrawlConfig,
        renderer: Arc<dyn Renderer>,
        events: mpsc::Sender<CrawlEvent>,
    ) -> Result<Self> {
        config.validate()?;

        let filter = UrlFilter::from_config(&config)?;
        let frontier = Frontier::new(filter, config.max_depth);
        let options = Arc::new(NavigationOptions::from(&config));
        let slots = RenderSlots::new(config.concurrent_pages as usize);

        Ok(Self {
            config,
            options,
            frontier,
            renderer,
            slots,
            events,
            redirected: 0,
        })
    }

    /// Handle to the render slots; closing it cancels the job's renders
    pub fn slots(&self) -> RenderSlots {
        self.slots.clone()
    }

    /// Runs the crawl to completion
    ///
    /// Stops once `max_pages` fingerprints are visited or the frontier is
    /// empty. A render failure marks the fingerprint visited and is reported,
    /// never retried. So does a render that redirects onto a page another
    /// entry owns or onto an out-of-scope URL.
    pub async fn run(mut self) -> Result<CrawlSummary> {
        let target = self.config.target_url.clone();
        tracing::info!("Starting crawl of {}", target);

        self.emit(CrawlEventKind::ScanStarted {
            target_url: target.clone(),
        })
        .await?;

        self.frontier.seed(&target)?;

        let max_pages = self.config.max_pages as usize;
        let concurrency = self.config.concurrent_pages as usize;

        loop {
            let remaining = max_pages.saturating_sub(self.frontier.visited_count());
            if remaining == 0 {
                tracing::info!("Reached max_pages ({})", max_pages);
                break;
            }

            let batch = self.frontier.next_batch(remaining.min(concurrency));
            if batch.is_empty() {
                tracing::info!("Frontier exhausted");
                break;
            }

            tracing::debug!(
                "Dispatching {} pages at depth {} ({} queued)",
                batch.len(),
                batch[0].depth,
                self.frontier.queued()
            );

            for entry in &batch {
                self.emit(CrawlEventKind::PageDiscovered(entry.clone())).await?;
            }

            let mut in_flight: FuturesUnordered<_> = batch
                .into_iter()
                .map(|entry| {
                    render_entry(
                        Arc::clone(&self.renderer),
                        self.slots.clone(),
                        Arc::clone(&self.options),
                        entry,
                    )
                })
                .collect();

            while let Some((entry, result)) = in_flight.next().await {
                let outcome = match result {
                    Ok(rendered) => self.fold_success(&entry, rendered)?,
                    Err(error) => {
                        tracing::warn!("Failed to render {}: {}", entry.url, error);
                        self.frontier
                            .complete(&entry.fingerprint, FrontierState::Failed)?;
                        PageOutcome::Failed(error)
                    }
                };

                self.emit(CrawlEventKind::PageCrawled { entry, outcome }).await?;
            }
        }

        let summary = self.summary();
        tracing::info!(
            "Crawl of {} finished: {} crawled, {} failed, {} discovered",
            target,
            summary.pages_crawled,
            summary.pages_failed,
            summary.pages_discovered
        );

        self.emit(CrawlEventKind::ScanCompleted(summary)).await?;
        Ok(summary)
    }

    fn fold_success(
        &mut self,
        entry: &FrontierEntry,
        rendered: RenderedPage,
    ) -> Result<PageOutcome> {
        self.frontier
            .complete(&entry.fingerprint, FrontierState::Visited)?;

        if let Some(fingerprint) = rendered.redirect_fingerprint(entry) {
            if let Err(skip) = self.frontier.claim_redirect(&rendered.final_url, &fingerprint) {
                tracing::info!(
                    "{} redirected to {} ({}), not analysed",
                    entry.url,
                    rendered.final_url,
                    skip
                );
                self.redirected += 1;
                return Ok(PageOutcome::Redirected {
                    final_url: rendered.final_url,
                    reason: skip.to_string(),
                });
            }
        }

        let parent = if rendered.final_url.is_empty() {
            entry.url.clone()
        } else {
            rendered.final_url.clone()
        };

        let mut admitted = 0;
        for link in &rendered.links {
            match self.frontier.offer(link, entry.depth + 1, &parent) {
                Ok(_) => admitted += 1,
                Err(skip) => tracing::debug!("Skipping {}: {}", link, skip),
            }
        }

        tracing::debug!(
            "Rendered {} [{}], {} of {} links admitted",
            entry.url,
            rendered.http_status,
            admitted,
            rendered.links.len()
        );

        Ok(PageOutcome::Rendered(Box::new(rendered.into_record(entry))))
    }

    fn summary(&self) -> CrawlSummary {
        let failed = self.frontier.failed_count();
        CrawlSummary {
            pages_crawled: self.frontier.visited_count() - failed - self.redirected,
            pages_failed: failed,
            pages_redirected: self.redirected,
            pages_discovered: self.frontier.discovered_count(),
        }
    }

    async fn emit(&self, kind: CrawlEventKind) -> Result<()> {
        self.events
            .send(CrawlEvent::new(kind))
            .await
            .map_err(|_| ReqonError::Aborted("event receiver dropped".to_string()))
    }
}

/// Renders one entry inside a render slot, bounded by the options' deadline
async fn render_entry(
    renderer: Arc<dyn Renderer>,
    slots: RenderSlots,
    options: Arc<NavigationOptions>,
    entry: FrontierEntry,
) -> (FrontierEntry, std::result::Result<RenderedPage, NavigationError>) {
    let result = async {
        let url = Url::parse(&entry.url).map_err(|e| NavigationError::Other(e.to_string()))?;
        let _slot = slots.acquire().await?;

        let deadline = options.deadline();
        match tokio::time::timeout(deadline, renderer.render(&url, &options)).await {
            Ok(result) => result,
            Err(_) => Err(NavigationError::Timeout {
                after_ms: deadline.as_millis() as u64,
            }),
        }
    }
    .await;

    (entry, result)
}

/// A running crawl job
///
/// Yields the job's events in order; [`CrawlStream::finish`] waits for the
/// scheduler task and returns its summary.
pub struct CrawlStream {
    events: mpsc::Receiver<CrawlEvent>,
    task: JoinHandle<Result<CrawlSummary>>,
    slots: RenderSlots,
}

impl CrawlStream {
    pub async fn next(&mut self) -> Option<CrawlEvent> {
        self.events.recv().await
    }

    /// Closes the render slots; pending renders fail and the crawl winds down
    pub fn cancel(&self) {
        self.slots.close();
    }

    pub async fn finish(self) -> Result<CrawlSummary> {
        // Dropping the receiver unblocks a scheduler waiting to emit
        drop(self.events);
        self.task
            .await
            .map_err(|e| ReqonError::Aborted(e.to_string()))?
    }
}

/// Starts a crawl job on the current tokio runtime
///
/// Validates `config` first; an invalid configuration is returned as an
/// error and nothing is rendered.
///
/// # Arguments
///
/// * `config` - Crawl settings for the job
/// * `renderer` - Renderer shared by every page of the job
///
/// # Returns
///
/// * `Ok(CrawlStream)` - Events in order, ending with `scan_completed`
/// * `Err(ReqonError)` - The configuration was rejected
pub fn start(config: CrawlConfig, renderer: Arc<dyn Renderer>) -> Result<CrawlStream> {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let scheduler = Scheduler::new(config, renderer, tx)?;
    let slots = scheduler.slots();
    let task = tokio::spawn(scheduler.run());

    Ok(CrawlStream {
        events: rx,
        task,
        slots,
    })
}
