//! Content detectors

use crate::detector::{Detector, DetectorError, LivePage};
use crate::model::{Category, Finding, PageRecord, Severity};
use async_trait::async_trait;
use regex::Regex;

const TEMPLATE_VARIABLE: &str =
    r"(\{\{\s*[a-zA-Z0-9_]+\s*\}\}|\[\[\s*[a-zA-Z0-9_]+\s*\]\])";

/// Placeholder text and template variables that leaked into the page
pub struct BrokenContent;

#[async_trait]
impl Detector for BrokenContent {
    fn name(&self) -> &'static str {
        "broken_content"
    }

    fn category(&self) -> Category {
        Category::Content
    }

    async fn detect(
        &self,
        page: &PageRecord,
        _live: Option<&dyn LivePage>,
    ) -> Result<Vec<Finding>, DetectorError> {
        let dom = &page.dom_snapshot;
        let mut findings = Vec::new();

        if dom.to_lowercase().contains("lorem ipsum") {
            findings.push(
                self.finding("placeholder_text", Severity::Medium, "Placeholder Text Detected")
                    .with_description("The page contains 'Lorem ipsum' placeholder text"),
            );
        }

        if let Some(variable) = Regex::new(TEMPLATE_VARIABLE)?.find(dom) {
            findings.push(
                self.finding(
                    "template_variable",
                    Severity::High,
                    "Unresolved Template Variable",
                )
                .with_description(format!(
                    "Raw template variable displayed on page: {}",
                    variable.as_str()
                ))
                .with_evidence("variable", variable.as_str()),
            );
        }

        Ok(findings)
    }
}
