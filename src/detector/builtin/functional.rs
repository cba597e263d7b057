//! Functional detectors: script errors, failed requests, forms, dead ends, broken links

use crate::config::DetectorsConfig;
use crate::detector::{Detector, DetectorError, LivePage};
use crate::model::{Category, ConsoleLevel, Finding, PageRecord, Severity};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;

/// Console messages that are noise rather than page defects
const BENIGN_ERRORS: [&str; 4] = [
    "cast_sender.js",
    "favicon",
    "extension",
    "the server responded with a status of 404",
];

/// Link checks in flight per page
const LINK_CHECK_CONCURRENCY: usize = 8;

/// Console errors raised while the page ran
pub struct JavaScriptErrors;

#[async_trait]
impl Detector for JavaScriptErrors {
    fn name(&self) -> &'static str {
        "javascript_errors"
    }

    fn category(&self) -> Category {
        Category::Functional
    }

    async fn detect(
        &self,
        page: &PageRecord,
        _live: Option<&dyn LivePage>,
    ) -> Result<Vec<Finding>, DetectorError> {
        let findings = page
            .console
            .iter()
            .filter(|entry| entry.level == ConsoleLevel::Error)
            .filter(|entry| {
                let text = entry.text.to_lowercase();
                !BENIGN_ERRORS.iter().any(|benign| text.contains(benign))
            })
            .map(|entry| {
                let severity = if entry.text.contains("TypeError")
                    || entry.text.contains("ReferenceError")
                {
                    Severity::Critical
                } else {
                    Severity::Medium
                };
                let mut finding = self
                    .finding("console_error", severity, "JavaScript Error on Page")
                    .with_description(entry.text.clone())
                    .with_evidence("message", entry.text.as_str());
                if let Some(location) = &entry.location {
                    finding = finding.with_evidence("location", location.as_str());
                }
                finding
            })
            .collect();

        Ok(findings)
    }
}

/// Requests that came back with an error status
pub struct ApiErrors;

#[async_trait]
impl Detector for ApiErrors {
    fn name(&self) -> &'static str {
        "api_errors"
    }

    fn category(&self) -> Category {
        Category::Functional
    }

    async fn detect(
        &self,
        page: &PageRecord,
        _live: Option<&dyn LivePage>,
    ) -> Result<Vec<Finding>, DetectorError> {
        let findings = page
            .network
            .iter()
            .filter_map(|entry| entry.status.filter(|s| *s >= 400).map(|s| (entry, s)))
            .map(|(entry, status)| {
                let severity = if status >= 500 {
                    Severity::Critical
                } else {
                    Severity::High
                };
                self.finding(
                    "http_api_error",
                    severity,
                    format!("Failed Network Request ({})", status),
                )
                .with_description(format!("{} {} returned {}", entry.method, entry.url, status))
                .with_evidence("url", entry.url.as_str())
                .with_evidence("method", entry.method.as_str())
                .with_evidence("status", status)
            })
            .collect();

        Ok(findings)
    }
}

/// Required form inputs that cannot be submitted because they have no name
pub struct FormValidation;

#[async_trait]
impl Detector for FormValidation {
    fn name(&self) -> &'static str {
        "form_validation"
    }

    fn category(&self) -> Category {
        Category::Functional
    }

    async fn detect(
        &self,
        page: &PageRecord,
        _live: Option<&dyn LivePage>,
    ) -> Result<Vec<Finding>, DetectorError> {
        let mut findings = Vec::new();
        for form in &page.forms {
            for input in form.inputs.iter().filter(|i| i.required && i.name.is_none()) {
                let mut finding = self
                    .finding(
                        "missing_form_name",
                        Severity::Medium,
                        "Form Input Missing Name Attribute",
                    )
                    .with_description("A required input has no name and is dropped on submit")
                    .with_evidence("input_type", input.input_type.as_str());
                if let Some(id) = &form.id {
                    finding = finding.with_selector(format!("form#{}", id));
                }
                findings.push(finding);
            }
        }
        Ok(findings)
    }
}

/// Pages with no outbound links
///
/// Error responses are left alone: their status is already reported.
pub struct DeadEndPages;

#[async_trait]
impl Detector for DeadEndPages {
    fn name(&self) -> &'static str {
        "dead_links"
    }

    fn category(&self) -> Category {
        Category::Functional
    }

    async fn detect(
        &self,
        page: &PageRecord,
        _live: Option<&dyn LivePage>,
    ) -> Result<Vec<Finding>, DetectorError> {
        if !page.links.is_empty() || page.http_status >= 400 {
            return Ok(Vec::new());
        }

        Ok(vec![self
            .finding("orphan_page", Severity::Medium, "Dead End Page")
            .with_description("This page has no outgoing links to other pages")
            .with_evidence("url", page.url.as_str())])
    }
}

/// Outbound links that answer with an error or not at all
///
/// The only built-in detector that goes back to the network. Its client is
/// built once and shared by every page the detector checks.
pub struct BrokenLinks {
    client: Client,
    limit: usize,
}

impl BrokenLinks {
    pub fn new(config: &DetectorsConfig) -> Self {
        let mut builder = Client::builder()
            .timeout(Duration::from_millis(config.link_check_timeout_ms))
            .redirect(Policy::limited(10));
        if let Some(agent) = &config.link_check_user_agent {
            builder = builder.user_agent(agent.as_str());
        }

        let client = builder.build().unwrap_or_else(|e| {
            tracing::warn!("Link checker client setup failed, using defaults: {}", e);
            Client::new()
        });

        Self {
            client,
            limit: config.link_check_limit,
        }
    }

    fn classify(&self, link: &str, status: StatusCode) -> Option<Finding> {
        let code = status.as_u16();
        let severity = match code {
            500..=u16::MAX => Severity::Critical,
            401 | 403 => Severity::Medium,
            400..=499 => Severity::High,
            _ => return None,
        };
        Some(
            self.finding(
                "broken_link",
                severity,
                format!("Broken link returning HTTP {}", code),
            )
            .with_evidence("href", link)
            .with_evidence("status", code),
        )
    }

    fn connection_failure(&self, link: &str, error: &reqwest::Error) -> Finding {
        self.finding("broken_link", Severity::High, "Broken link: Connection failed")
            .with_description(error.to_string())
            .with_evidence("href", link)
    }
}

#[async_trait]
impl Detector for BrokenLinks {
    fn name(&self) -> &'static str {
        "broken_links"
    }

    fn category(&self) -> Category {
        Category::Functional
    }

    async fn detect(
        &self,
        page: &PageRecord,
        _live: Option<&dyn LivePage>,
    ) -> Result<Vec<Finding>, DetectorError> {
        let links: Vec<String> = page
            .links
            .iter()
            .filter(|link| link.starts_with("http://") || link.starts_with("https://"))
            .take(self.limit)
            .cloned()
            .collect();

        let checks = links.into_iter().map(|link| {
            let client = self.client.clone();
            async move {
                let result = client.head(link.as_str()).send().await;
                (link, result)
            }
        });

        let results: Vec<_> = stream::iter(checks)
            .buffered(LINK_CHECK_CONCURRENCY)
            .collect()
            .await;

        let findings = results
            .into_iter()
            .filter_map(|(link, result)| match result {
                Ok(response) => self.classify(&link, response.status()),
                Err(e) => {
                    tracing::debug!("Link check failed for {}: {}", link, e);
                    Some(self.connection_failure(&link, &e))
                }
            })
            .collect();

        Ok(findings)
    }
}
