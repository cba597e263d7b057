//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use reqon_core::config::CrawlConfig;
use reqon_core::crawler::{NavigationError, NavigationOptions, RenderedPage, Renderer};
use reqon_core::events::{CrawlEvent, CrawlEventKind};
use reqon_core::normalize_url;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

pub const SITE: &str = "https://site.test/";

/// Crawl settings small enough for tests
pub fn crawl_config(target: &str) -> CrawlConfig {
    let mut config = CrawlConfig::new(target);
    config.max_pages = 50;
    config.max_depth = 5;
    config.concurrent_pages = 2;
    config.page_timeout_ms = 2_000;
    config.wait_after_load_ms = 0;
    config
}

#[derive(Clone)]
enum Behavior {
    Html { title: String, html: String },
    Slow(Duration),
    Fail(NavigationError),
    /// Lands on another URL, served as an empty page
    Redirect(String),
}

#[derive(Clone)]
struct FakePage {
    links: Vec<String>,
    behavior: Behavior,
}

/// In-memory site served through the [`Renderer`] port
///
/// Pages are keyed by normalized URL. Unknown URLs render as an empty 404.
#[derive(Default)]
pub struct FakeSite {
    pages: HashMap<String, FakePage>,
    calls: Mutex<Vec<String>>,
    in_flight: Arc<AtomicUsize>,
    peak: AtomicUsize,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a page linking to `links`, resolved against `url`
    pub fn page(self, url: &str, links: &[&str]) -> Self {
        let title = format!("Page {}", url);
        let html = format!(
            "<html><head><title>{}</title></head><body><h1>Hello</h1></body></html>",
            title
        );
        self.insert(url, links, Behavior::Html { title, html })
    }

    pub fn html(self, url: &str, title: &str, html: &str) -> Self {
        self.insert(
            url,
            &[],
            Behavior::Html {
                title: title.to_string(),
                html: html.to_string(),
            },
        )
    }

    /// A page whose render takes `delay` before succeeding
    pub fn slow(self, url: &str, delay: Duration) -> Self {
        self.insert(url, &[], Behavior::Slow(delay))
    }

    pub fn failing(self, url: &str, error: NavigationError) -> Self {
        self.insert(url, &[], Behavior::Fail(error))
    }

    /// A page that redirects to `target`
    pub fn redirect(self, url: &str, target: &str) -> Self {
        self.insert(url, &[], Behavior::Redirect(target.to_string()))
    }

    fn insert(mut self, url: &str, links: &[&str], behavior: Behavior) -> Self {
        let base = Url::parse(url).unwrap();
        let links = links
            .iter()
            .map(|link| base.join(link).unwrap().to_string())
            .collect();
        self.pages
            .insert(normalize_url(url).unwrap(), FakePage { links, behavior });
        self
    }

    /// URLs rendered so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Most renders observed in flight at once
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Renderer for FakeSite {
    async fn render(
        &self,
        url: &Url,
        options: &NavigationOptions,
    ) -> Result<RenderedPage, NavigationError> {
        self.calls.lock().unwrap().push(url.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(Arc::clone(&self.in_flight));

        let key = normalize_url(url.as_str()).unwrap();
        let Some(page) = self.pages.get(&key).cloned() else {
            return Ok(RenderedPage {
                final_url: url.to_string(),
                http_status: 404,
                ..Default::default()
            });
        };

        // Yield so concurrent renders overlap
        tokio::time::sleep(Duration::from_millis(5)).await;

        let mut final_url = url.to_string();
        let (title, content) = match page.behavior {
            Behavior::Html { title, html } => (title, html),
            Behavior::Slow(delay) => {
                tokio::time::sleep(delay).await;
                ("Slow".to_string(), String::new())
            }
            Behavior::Fail(error) => return Err(error),
            Behavior::Redirect(target) => {
                final_url = target;
                ("Moved".to_string(), String::new())
            }
        };

        // Stand-in image bytes: the final URL
        let screenshot = options
            .capture_screenshots
            .then(|| final_url.clone().into_bytes());

        Ok(RenderedPage {
            final_url,
            http_status: 200,
            title,
            content,
            links: page.links,
            screenshot,
            ..Default::default()
        })
    }
}

/// Drains a crawl stream, returning every event in order
pub async fn drain(stream: &mut reqon_core::crawler::CrawlStream) -> Vec<CrawlEvent> {
    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        events.push(event);
    }
    events
}

/// URLs of the `page_crawled` events, in emission order
pub fn crawled_urls(events: &[CrawlEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match &e.kind {
            CrawlEventKind::PageCrawled { entry, .. } => Some(entry.url.clone()),
            _ => None,
        })
        .collect()
}
