//! Security detectors

use crate::detector::{Detector, DetectorError, LivePage};
use crate::model::{Category, Finding, PageRecord, Severity};
use async_trait::async_trait;
use regex::Regex;

/// Insecure sub-resources on a secure page
pub struct MixedContent;

#[async_trait]
impl Detector for MixedContent {
    fn name(&self) -> &'static str {
        "mixed_content"
    }

    fn category(&self) -> Category {
        Category::Security
    }

    async fn detect(
        &self,
        page: &PageRecord,
        _live: Option<&dyn LivePage>,
    ) -> Result<Vec<Finding>, DetectorError> {
        if !page.is_https() {
            return Ok(Vec::new());
        }

        let findings = page
            .network
            .iter()
            .filter(|entry| entry.url.starts_with("http://"))
            .map(|entry| {
                let active = entry.url.ends_with(".js") || entry.url.ends_with(".css");
                let severity = if active {
                    Severity::Critical
                } else {
                    Severity::Medium
                };
                self.finding("mixed_content", severity, "Mixed Content Detected")
                    .with_description(format!(
                        "Insecure resource loaded on secure page: {}",
                        entry.url
                    ))
                    .with_evidence("url", entry.url.as_str())
            })
            .collect();

        Ok(findings)
    }
}

/// Hardening headers missing from the main document response
pub struct InsecureHeaders;

#[async_trait]
impl Detector for InsecureHeaders {
    fn name(&self) -> &'static str {
        "insecure_headers"
    }

    fn category(&self) -> Category {
        Category::Security
    }

    async fn detect(
        &self,
        page: &PageRecord,
        _live: Option<&dyn LivePage>,
    ) -> Result<Vec<Finding>, DetectorError> {
        let Some(document) = page.document_entry() else {
            return Ok(Vec::new());
        };

        let mut required = vec![
            "Content-Security-Policy",
            "X-Frame-Options",
            "X-Content-Type-Options",
        ];
        if page.is_https() {
            required.push("Strict-Transport-Security");
        }

        let findings = required
            .into_iter()
            .filter(|header| document.header(header).is_none())
            .map(|header| {
                self.finding(
                    "missing_header",
                    Severity::Medium,
                    format!("Missing Security Header: {}", header),
                )
                .with_description(format!("The page response is lacking the {} header", header))
                .with_evidence("header", header)
            })
            .collect();

        Ok(findings)
    }
}

/// Secrets and personal data in the page source
const SENSITIVE_PATTERNS: [(&str, &str); 5] = [
    ("aws_key", r"AKIA[0-9A-Z]{16}"),
    ("github_token", r"ghp_[0-9a-zA-Z]{36}"),
    ("ssn", r"\b\d{3}-\d{2}-\d{4}\b"),
    (
        "credit_card",
        r"\b(?:4[0-9]{12}(?:[0-9]{3})?|5[1-5][0-9]{14}|6(?:011|5[0-9][0-9])[0-9]{12}|3[47][0-9]{13}|3(?:0[0-5]|[68][0-9])[0-9]{11}|(?:2131|1800|35\d{3})\d{11})\b",
    ),
    (
        "private_ip",
        r"\b(?:10\.\d{1,3}\.\d{1,3}\.\d{1,3}|172\.(?:1[6-9]|2\d|3[01])\.\d{1,3}\.\d{1,3}|192\.168\.\d{1,3}\.\d{1,3})\b",
    ),
];

const REDACTED: &str = "***REDACTED***";

/// Credentials and personal data exposed in the DOM
///
/// Reports at most one finding per kind of data, and never the match itself.
pub struct SensitiveDataExposure;

#[async_trait]
impl Detector for SensitiveDataExposure {
    fn name(&self) -> &'static str {
        "sensitive_data_exposure"
    }

    fn category(&self) -> Category {
        Category::Security
    }

    async fn detect(
        &self,
        page: &PageRecord,
        _live: Option<&dyn LivePage>,
    ) -> Result<Vec<Finding>, DetectorError> {
        let mut findings = Vec::new();
        for (kind, pattern) in SENSITIVE_PATTERNS {
            if !Regex::new(pattern)?.is_match(&page.dom_snapshot) {
                continue;
            }
            let severity = match kind {
                "aws_key" | "github_token" => Severity::Critical,
                _ => Severity::High,
            };
            findings.push(
                self.finding(
                    &format!("exposed_{}", kind),
                    severity,
                    format!("Sensitive Data Exposed: {}", kind),
                )
                .with_description(format!("Possible {} found in page source", kind))
                .with_evidence("match_snippet", REDACTED),
            );
        }
        Ok(findings)
    }
}
