//! Page renderer port
//!
//! The crawler only depends on the [`Renderer`] trait. How a page is actually
//! rendered (plain HTTP, a headless browser, a test double) is up to the
//! implementation.

use crate::config::CrawlConfig;
use crate::model::{
    ConsoleEntry, FormDescriptor, FrontierEntry, NetworkEntry, PageRecord, PageStructure,
    PerformanceMetrics,
};
use crate::url::UrlFingerprint;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

/// Errors a render call can end with
///
/// Every variant is terminal for the URL within the current job.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NavigationError {
    #[error("Navigation timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Too many redirects")]
    TooManyRedirects,

    #[error("Disallowed by robots.txt: {0}")]
    RobotsDisallowed(String),

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Renderer closed")]
    Closed,

    #[error("Navigation failed: {0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Per-call navigation settings, derived from the job's [`CrawlConfig`]
#[derive(Debug, Clone)]
pub struct NavigationOptions {
    pub timeout: Duration,
    pub wait_after_load: Duration,
    pub respect_robots_txt: bool,
    pub capture_screenshots: bool,
    pub capture_network: bool,
    pub capture_console: bool,
    pub viewport: Viewport,
    pub user_agent: String,
    pub extra_headers: BTreeMap<String, String>,
}

impl NavigationOptions {
    /// Upper bound the scheduler allows one render call
    pub fn deadline(&self) -> Duration {
        self.timeout + self.wait_after_load
    }
}

impl From<&CrawlConfig> for NavigationOptions {
    fn from(config: &CrawlConfig) -> Self {
        Self {
            timeout: config.page_timeout(),
            wait_after_load: config.wait_after_load(),
            respect_robots_txt: config.respect_robots_txt,
            capture_screenshots: config.capture_screenshots,
            capture_network: config.capture_network,
            capture_console: config.capture_console,
            viewport: Viewport {
                width: config.viewport_width,
                height: config.viewport_height,
            },
            user_agent: config.user_agent.clone(),
            extra_headers: config.extra_headers.clone(),
        }
    }
}

/// Everything a renderer hands back for one page
///
/// The scheduler turns it into a [`PageRecord`] once it knows the frontier
/// entry the page came from.
#[derive(Debug, Clone, Default)]
pub struct RenderedPage {
    /// URL after redirects
    pub final_url: String,
    pub http_status: u16,
    pub title: String,
    pub content: String,
    pub structure: PageStructure,
    pub console: Vec<ConsoleEntry>,
    pub network: Vec<NetworkEntry>,
    pub performance: PerformanceMetrics,
    /// Absolute outbound links, first occurrence order
    pub links: Vec<String>,
    pub forms: Vec<FormDescriptor>,
    pub screenshot: Option<Vec<u8>>,
}

impl RenderedPage {
    /// Fingerprint of the final URL when it differs from the entry's
    pub fn redirect_fingerprint(&self, entry: &FrontierEntry) -> Option<UrlFingerprint> {
        if self.final_url.is_empty() {
            return None;
        }
        UrlFingerprint::of(&self.final_url)
            .ok()
            .filter(|fp| *fp != entry.fingerprint)
    }

    /// Builds the page record; identity always comes from the entry
    pub fn into_record(self, entry: &FrontierEntry) -> PageRecord {
        let final_url = if self.final_url.is_empty() {
            entry.url.clone()
        } else {
            self.final_url
        };

        PageRecord {
            url: entry.url.clone(),
            final_url,
            fingerprint: entry.fingerprint.clone(),
            title: self.title,
            http_status: self.http_status,
            depth: entry.depth,
            parent_url: entry.parent_url.clone(),
            dom_snapshot: self.content,
            structure: self.structure,
            console: self.console,
            network: self.network,
            performance: self.performance,
            links: self.links,
            forms: self.forms,
            screenshot: self.screenshot,
            crawled_at: Utc::now(),
        }
    }
}

/// Capability to render one page
///
/// Implementations must be safe to call concurrently up to the job's
/// `concurrent_pages`, and must release any per-call resource on every exit
/// path. The scheduler may drop a call mid-flight when its deadline passes.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(
        &self,
        url: &Url,
        options: &NavigationOptions,
    ) -> Result<RenderedPage, NavigationError>;
}

/// Pool of render slots, one per concurrently rendered page
///
/// A [`RenderSlot`] is taken before navigation starts and given back when it
/// is dropped, whichever way the render ends. Closing the pool makes every
/// later acquisition fail with [`NavigationError::Closed`].
#[derive(Debug, Clone)]
pub struct RenderSlots {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// Held for the duration of one render call
#[derive(Debug)]
pub struct RenderSlot {
    _permit: OwnedSemaphorePermit,
}

impl RenderSlots {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub async fn acquire(&self) -> Result<RenderSlot, NavigationError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| NavigationError::Closed)?;
        Ok(RenderSlot { _permit: permit })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn in_use(&self) -> usize {
        self.capacity.saturating_sub(self.available())
    }

    /// Stops handing out slots; in-flight renders keep theirs
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_slot_released_on_drop() {
        let slots = RenderSlots::new(2);
        let a = slots.acquire().await.unwrap();
        let _b = slots.acquire().await.unwrap();
        assert_eq!(slots.available(), 0);
        assert_eq!(slots.in_use(), 2);

        drop(a);
        assert_eq!(slots.available(), 1);
    }

    #[tokio::test]
    async fn test_slot_released_when_future_cancelled() {
        let slots = RenderSlots::new(1);
        let held = slots.clone();
        let result = tokio::time::timeout(Duration::from_millis(10), async move {
            let _slot = held.acquire().await?;
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, NavigationError>(())
        })
        .await;

        assert!(result.is_err());
        assert_eq!(slots.available(), 1);
    }

    #[tokio::test]
    async fn test_closed_pool_fails_acquisition() {
        let slots = RenderSlots::new(1);
        slots.close();
        assert!(slots.is_closed());
        assert_eq!(slots.acquire().await.unwrap_err(), NavigationError::Closed);
    }

    #[test]
    fn test_options_from_config() {
        let mut config = CrawlConfig::new("https://example.com/");
        config.page_timeout_ms = 5_000;
        config.wait_after_load_ms = 500;
        let options = NavigationOptions::from(&config);
        assert_eq!(options.deadline(), Duration::from_millis(5_500));
        assert_eq!(options.viewport.width, 1920);
        assert_eq!(options.user_agent, "ReQon-QA-Bot/1.0");
    }

    fn old_entry() -> FrontierEntry {
        FrontierEntry {
            url: "https://example.com/old".to_string(),
            fingerprint: UrlFingerprint::of("https://example.com/old").unwrap(),
            depth: 2,
            parent_url: Some("https://example.com".to_string()),
        }
    }

    #[test]
    fn test_into_record_keeps_requested_identity() {
        let entry = old_entry();
        let rendered = RenderedPage {
            final_url: "https://example.com/new".to_string(),
            http_status: 200,
            screenshot: Some(vec![0x89, b'P', b'N', b'G']),
            ..RenderedPage::default()
        };
        assert_eq!(
            rendered.redirect_fingerprint(&entry),
            Some(UrlFingerprint::of("https://example.com/new").unwrap())
        );

        let record = rendered.into_record(&entry);
        assert_eq!(record.url, "https://example.com/old");
        assert_eq!(record.final_url, "https://example.com/new");
        assert_eq!(record.fingerprint, entry.fingerprint);
        assert_eq!(record.depth, 2);
        assert!(record.was_redirected());
        assert_eq!(record.screenshot.as_deref(), Some(&[0x89, b'P', b'N', b'G'][..]));
    }

    #[test]
    fn test_equivalent_final_url_is_not_a_redirect() {
        let entry = old_entry();
        let rendered = RenderedPage {
            final_url: "https://EXAMPLE.com/old/".to_string(),
            ..RenderedPage::default()
        };
        assert_eq!(rendered.redirect_fingerprint(&entry), None);

        let record = RenderedPage::default().into_record(&entry);
        assert_eq!(record.final_url, entry.url);
        assert!(!record.was_redirected());
    }
}
