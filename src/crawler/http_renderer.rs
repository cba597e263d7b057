//! Plain HTTP renderer
//!
//! Fetches pages with `reqwest` and extracts everything with `scraper`.
//! There is no script execution, so console entries are always empty and
//! browser-only metrics (LCP, FID, CLS) are absent. Nothing is painted
//! either, so pages never carry a screenshot.

use crate::crawler::parser::parse_html;
use crate::crawler::renderer::{NavigationError, NavigationOptions, RenderedPage, Renderer};
use crate::model::{NetworkEntry, PerformanceMetrics, ResourceType};
use crate::robots::RobotsCache;
use crate::{ReqonError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{redirect::Policy, Client};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use url::Url;

/// Redirect hops followed before giving up
const MAX_REDIRECTS: usize = 10;

/// Renders pages over plain HTTP
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: Client,
    robots: RobotsCache,
}

impl HttpRenderer {
    /// Builds the renderer's HTTP client from the job's navigation options
    ///
    /// Fails with [`ReqonError::RendererStartup`] when the client cannot be
    /// built, which aborts the job.
    pub fn new(options: &NavigationOptions) -> Result<Self> {
        let client = build_http_client(options)
            .map_err(|e| ReqonError::RendererStartup(e.to_string()))?;

        Ok(Self {
            client,
            robots: RobotsCache::new(),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Builds an HTTP client with the configured user agent and headers
pub fn build_http_client(options: &NavigationOptions) -> std::result::Result<Client, String> {
    let mut headers = HeaderMap::new();
    for (name, value) in &options.extra_headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| e.to_string())?;
        let value = HeaderValue::from_str(value).map_err(|e| e.to_string())?;
        headers.insert(name, value);
    }

    Client::builder()
        .user_agent(options.user_agent.as_str())
        .default_headers(headers)
        .timeout(options.timeout)
        .connect_timeout(options.timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
        .map_err(|e| e.to_string())
}

fn classify(error: reqwest::Error, timeout: Duration) -> NavigationError {
    if error.is_timeout() {
        NavigationError::Timeout {
            after_ms: timeout.as_millis() as u64,
        }
    } else if error.is_redirect() {
        NavigationError::TooManyRedirects
    } else if error.is_connect() {
        NavigationError::Connection(error.to_string())
    } else if error.is_body() || error.is_decode() {
        NavigationError::Body(error.to_string())
    } else {
        NavigationError::Other(error.to_string())
    }
}

fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect()
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(
        &self,
        url: &Url,
        options: &NavigationOptions,
    ) -> std::result::Result<RenderedPage, NavigationError> {
        if options.respect_robots_txt {
            let rules = self.robots.rules_for(&self.client, url).await;
            if !rules.is_allowed(url.as_str(), &options.user_agent) {
                return Err(NavigationError::RobotsDisallowed(url.to_string()));
            }
        }

        let started = Instant::now();
        let response = self
            .client
            .get(url.clone())
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| classify(e, options.timeout))?;
        let ttfb = started.elapsed();

        let final_url = response.url().clone();
        let status = response.status().as_u16();
        let headers = header_map(response.headers());
        let is_html = headers
            .get("content-type")
            .map_or(true, |ct| ct.contains("text/html") || ct.contains("xhtml"));

        let body = response
            .text()
            .await
            .map_err(|e| classify(e, options.timeout))?;
        let load_time = started.elapsed();

        let mut page = RenderedPage {
            final_url: final_url.to_string(),
            http_status: status,
            performance: PerformanceMetrics {
                ttfb_ms: Some(millis(ttfb)),
                load_time_ms: Some(millis(load_time)),
                ..PerformanceMetrics::default()
            },
            ..RenderedPage::default()
        };

        if options.capture_network {
            page.network.push(NetworkEntry {
                url: final_url.to_string(),
                method: "GET".to_string(),
                status: Some(status),
                resource_type: ResourceType::Document,
                headers,
            });
        }

        if is_html {
            let parsed = parse_html(&body, &final_url);
            page.title = parsed.title.unwrap_or_default();
            page.links = parsed.links;
            page.forms = parsed.forms;
            page.structure = parsed.structure;

            if options.capture_network {
                page.network
                    .extend(parsed.subresources.into_iter().map(|(url, kind)| NetworkEntry {
                        url,
                        method: "GET".to_string(),
                        status: None,
                        resource_type: kind,
                        headers: BTreeMap::new(),
                    }));
            }
        } else {
            tracing::debug!("{} is not HTML, no links extracted", final_url);
        }

        page.content = body;
        Ok(page)
    }
}
