use crate::crawler::NavigationError;
use crate::model::{FrontierEntry, PageRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One step of a crawl, as emitted by the scheduler
///
/// Per job the order is fixed: `scan_started` first, a `page_discovered`
/// before the matching `page_crawled`, and `scan_completed` last.
#[derive(Debug, Clone)]
pub struct CrawlEvent {
    pub at: DateTime<Utc>,
    pub kind: CrawlEventKind,
}

#[derive(Debug, Clone)]
pub enum CrawlEventKind {
    ScanStarted { target_url: String },
    PageDiscovered(FrontierEntry),
    PageCrawled {
        entry: FrontierEntry,
        outcome: PageOutcome,
    },
    ScanCompleted(CrawlSummary),
}

/// Result of rendering one dispatched entry
#[derive(Debug, Clone)]
pub enum PageOutcome {
    Rendered(Box<PageRecord>),
    /// Render ended on a page that is already known or out of scope; it is
    /// not analysed
    Redirected { final_url: String, reason: String },
    Failed(NavigationError),
}

/// Counters reported with `scan_completed`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    /// Pages rendered successfully
    pub pages_crawled: usize,
    pub pages_failed: usize,
    /// Renders that redirected onto a known or out-of-scope page
    pub pages_redirected: usize,
    /// Every fingerprint admitted to the frontier, dispatched or not
    pub pages_discovered: usize,
}

impl CrawlSummary {
    /// Pages that count against `max_pages`
    pub fn pages_visited(&self) -> usize {
        self.pages_crawled + self.pages_failed + self.pages_redirected
    }
}

impl CrawlEvent {
    pub fn new(kind: CrawlEventKind) -> Self {
        Self {
            at: Utc::now(),
            kind,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self.kind {
            CrawlEventKind::ScanStarted { .. } => "scan_started",
            CrawlEventKind::PageDiscovered(_) => "page_discovered",
            CrawlEventKind::PageCrawled { .. } => "page_crawled",
            CrawlEventKind::ScanCompleted(_) => "scan_completed",
        }
    }
}
