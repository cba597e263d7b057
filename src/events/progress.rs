use super::{CrawlEvent, CrawlEventKind, PageOutcome};
use crate::model::{Finding, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Human-facing level of a progress message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warn,
    Error,
}

/// Machine fields carried by structured progress messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventDetail {
    ScanStarted {
        url: String,
    },
    PageDiscovered {
        url: String,
        depth: u32,
    },
    PageCrawled {
        url: String,
        depth: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        http_status: Option<u16>,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        redirected_to: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    IssueFound {
        url: String,
        title: String,
        severity: Severity,
        detector: String,
    },
    ScanCompleted {
        pages_crawled: usize,
        pages_discovered: usize,
        pages_failed: usize,
        overall_score: f64,
    },
}

/// One message on the event bus
///
/// Serializes as `{"time": "HH:MM:SS", "msg": .., "type": "info"|"warn"|"error"}`,
/// plus `"event"` and its machine fields when structured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressMessage {
    pub time: String,
    pub msg: String,
    #[serde(rename = "type")]
    pub level: Level,
    #[serde(flatten)]
    pub detail: Option<EventDetail>,
}

impl ProgressMessage {
    pub fn new(level: Level, msg: impl Into<String>) -> Self {
        Self::at(Utc::now(), level, msg)
    }

    fn at(time: DateTime<Utc>, level: Level, msg: impl Into<String>) -> Self {
        Self {
            time: time.format("%H:%M:%S").to_string(),
            msg: msg.into(),
            level,
            detail: None,
        }
    }

    pub fn info(msg: impl Into<String>) -> Self {
        Self::new(Level::Info, msg)
    }

    pub fn warn(msg: impl Into<String>) -> Self {
        Self::new(Level::Warn, msg)
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self::new(Level::Error, msg)
    }

    pub fn with_detail(mut self, detail: EventDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Name of the structured event, if any
    pub fn event(&self) -> Option<&'static str> {
        self.detail.as_ref().map(|d| match d {
            EventDetail::ScanStarted { .. } => "scan_started",
            EventDetail::PageDiscovered { .. } => "page_discovered",
            EventDetail::PageCrawled { .. } => "page_crawled",
            EventDetail::IssueFound { .. } => "issue_found",
            EventDetail::ScanCompleted { .. } => "scan_completed",
        })
    }

    /// Builds the message for a scheduler event
    ///
    /// `scan_completed` is not handled here since it needs the job score;
    /// see [`ProgressMessage::scan_completed`].
    pub fn from_crawl_event(event: &CrawlEvent) -> Option<Self> {
        let message = match &event.kind {
            CrawlEventKind::ScanStarted { target_url } => {
                Self::at(event.at, Level::Info, format!("Starting scan of {}", target_url))
                    .with_detail(EventDetail::ScanStarted {
                        url: target_url.clone(),
                    })
            }
            CrawlEventKind::PageDiscovered(entry) => Self::at(
                event.at,
                Level::Info,
                format!("Visiting {} (depth {})", entry.url, entry.depth),
            )
            .with_detail(EventDetail::PageDiscovered {
                url: entry.url.clone(),
                depth: entry.depth,
            }),
            CrawlEventKind::PageCrawled { entry, outcome } => match outcome {
                PageOutcome::Rendered(page) => Self::at(
                    event.at,
                    Level::Info,
                    format!("Crawled {} [{}]", page.url, page.http_status),
                )
                .with_detail(EventDetail::PageCrawled {
                    url: page.url.clone(),
                    depth: page.depth,
                    http_status: Some(page.http_status),
                    title: Some(page.title.clone()),
                    redirected_to: page.was_redirected().then(|| page.final_url.clone()),
                    error: None,
                }),
                PageOutcome::Redirected { final_url, reason } => Self::at(
                    event.at,
                    Level::Info,
                    format!("Skipped {}: redirected to {} ({})", entry.url, final_url, reason),
                )
                .with_detail(EventDetail::PageCrawled {
                    url: entry.url.clone(),
                    depth: entry.depth,
                    http_status: None,
                    title: None,
                    redirected_to: Some(final_url.clone()),
                    error: None,
                }),
                PageOutcome::Failed(error) => Self::at(
                    event.at,
                    Level::Error,
                    format!("Failed to crawl {}: {}", entry.url, error),
                )
                .with_detail(EventDetail::PageCrawled {
                    url: entry.url.clone(),
                    depth: entry.depth,
                    http_status: None,
                    title: None,
                    redirected_to: None,
                    error: Some(error.to_string()),
                }),
            },
            CrawlEventKind::ScanCompleted(_) => return None,
        };
        Some(message)
    }

    pub fn issue_found(page_url: &str, finding: &Finding) -> Self {
        let level = match finding.severity {
            Severity::Critical | Severity::High => Level::Warn,
            _ => Level::Info,
        };
        Self::new(
            level,
            format!("[{}] {} on {}", finding.severity, finding.title, page_url),
        )
        .with_detail(EventDetail::IssueFound {
            url: page_url.to_string(),
            title: finding.title.clone(),
            severity: finding.severity,
            detector: finding.detector.clone(),
        })
    }

    pub fn scan_completed(
        pages_crawled: usize,
        pages_discovered: usize,
        pages_failed: usize,
        overall_score: f64,
    ) -> Self {
        Self::info(format!(
            "Scan completed: {} pages crawled, score {:.1}",
            pages_crawled, overall_score
        ))
        .with_detail(EventDetail::ScanCompleted {
            pages_crawled,
            pages_discovered,
            pages_failed,
            overall_score,
        })
    }
}
