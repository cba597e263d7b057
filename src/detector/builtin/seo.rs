//! Search-engine detectors

use crate::detector::{Detector, DetectorError, LivePage};
use crate::model::{Category, Finding, PageRecord, Severity};
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::ops::RangeInclusive;

const TITLE_LENGTH: RangeInclusive<usize> = 30..=60;
const MAX_DESCRIPTION_LENGTH: usize = 160;
const MAX_URL_LENGTH: usize = 200;
/// Characters of a JSON-LD block kept as evidence
const JSON_LD_EXCERPT: usize = 100;

const META_SCRIPT: &str = "({ \
    title: document.title, \
    description: document.querySelector('meta[name=\"description\"]')?.content ?? null \
})";

#[derive(Debug, Default, Deserialize)]
struct MetaInfo {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

const ROBOTS_SCRIPT: &str =
    "document.querySelector('meta[name=\"robots\"]')?.content ?? ''";

const JSON_LD_SCRIPT: &str = "Array.from(\
    document.querySelectorAll('script[type=\"application/ld+json\"]')\
).map(s => s.textContent)";

/// Content of the first `<meta name=..>` with the given name, any case
fn named_meta(html: &str, name: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("meta[name]").ok()?;
    document
        .select(&selector)
        .filter(|meta| {
            meta.value()
                .attr("name")
                .map_or(false, |n| n.eq_ignore_ascii_case(name))
        })
        .find_map(|meta| meta.value().attr("content"))
        .map(|content| content.trim().to_string())
}

fn meta_description(html: &str) -> Option<String> {
    named_meta(html, "description")
}

fn json_ld_blocks(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("script[type]") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter(|script| {
            script
                .value()
                .attr("type")
                .map_or(false, |t| t.trim().eq_ignore_ascii_case("application/ld+json"))
        })
        .map(|script| script.text().collect())
        .collect()
}

fn excerpt(text: &str) -> String {
    text.trim().chars().take(JSON_LD_EXCERPT).collect()
}

/// Whether a parsed JSON-LD document names its schema type
///
/// A `@graph` container counts as typed; arrays need every object typed.
fn has_schema_type(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Object(map) => map.contains_key("@type") || map.contains_key("@graph"),
        serde_json::Value::Array(items) => items
            .iter()
            .all(|item| !item.is_object() || has_schema_type(item)),
        _ => false,
    }
}

/// Title and meta description checks
pub struct MetaTags;

impl MetaTags {
    async fn read(
        page: &PageRecord,
        live: Option<&dyn LivePage>,
    ) -> Result<MetaInfo, DetectorError> {
        match live {
            Some(live) => {
                let value = live.evaluate(META_SCRIPT).await?;
                serde_json::from_value(value).map_err(|e| DetectorError::Data(e.to_string()))
            }
            None => Ok(MetaInfo {
                title: Some(page.title.clone()),
                description: meta_description(&page.dom_snapshot),
            }),
        }
    }
}

#[async_trait]
impl Detector for MetaTags {
    fn name(&self) -> &'static str {
        "meta_tags"
    }

    fn category(&self) -> Category {
        Category::Seo
    }

    async fn detect(
        &self,
        page: &PageRecord,
        live: Option<&dyn LivePage>,
    ) -> Result<Vec<Finding>, DetectorError> {
        let meta = Self::read(page, live).await?;
        let mut findings = Vec::new();

        let title = meta.title.unwrap_or_default();
        let title_len = title.trim().chars().count();
        if title_len == 0 {
            findings.push(
                self.finding("missing_title", Severity::Critical, "Missing Page Title")
                    .with_description("The page is missing a <title> tag"),
            );
        } else if !TITLE_LENGTH.contains(&title_len) {
            findings.push(
                self.finding("bad_title_length", Severity::Medium, "Suboptimal Page Title Length")
                    .with_description(format!(
                        "Title length is {} characters (recommended {}-{})",
                        title_len,
                        TITLE_LENGTH.start(),
                        TITLE_LENGTH.end()
                    ))
                    .with_evidence("title", title.as_str()),
            );
        }

        match meta.description.filter(|d| !d.is_empty()) {
            None => findings.push(
                self.finding(
                    "missing_meta_description",
                    Severity::High,
                    "Missing Meta Description",
                )
                .with_description("The page is missing a meta description"),
            ),
            Some(description) if description.chars().count() > MAX_DESCRIPTION_LENGTH => findings
                .push(
                    self.finding(
                        "bad_description_length",
                        Severity::Medium,
                        "Meta Description Too Long",
                    )
                    .with_description(format!(
                        "Description length is {} characters (recommended at most {})",
                        description.chars().count(),
                        MAX_DESCRIPTION_LENGTH
                    ))
                    .with_evidence("description", description),
                ),
            Some(_) => {}
        }

        Ok(findings)
    }
}

/// URL shape checks
pub struct UrlStructure;

#[async_trait]
impl Detector for UrlStructure {
    fn name(&self) -> &'static str {
        "url_structure"
    }

    fn category(&self) -> Category {
        Category::Seo
    }

    async fn detect(
        &self,
        page: &PageRecord,
        _live: Option<&dyn LivePage>,
    ) -> Result<Vec<Finding>, DetectorError> {
        let mut findings = Vec::new();

        if page.url.len() > MAX_URL_LENGTH {
            findings.push(
                self.finding("long_url", Severity::Medium, "URL Too Long")
                    .with_description(format!(
                        "URL is {} characters (recommended at most {})",
                        page.url.len(),
                        MAX_URL_LENGTH
                    ))
                    .with_evidence("length", page.url.len()),
            );
        }

        let path = url::Url::parse(&page.url)
            .map(|u| u.path().to_string())
            .unwrap_or_default();
        if path.chars().any(|c| c.is_ascii_uppercase()) {
            findings.push(
                self.finding("mixed_case", Severity::Low, "Mixed Case URL")
                    .with_description("Uppercase characters in the path can create duplicate URLs")
                    .with_evidence("path", path),
            );
        }

        Ok(findings)
    }
}

/// Entry page kept out of search indexes
pub struct Crawlability;

#[async_trait]
impl Detector for Crawlability {
    fn name(&self) -> &'static str {
        "crawlability"
    }

    fn category(&self) -> Category {
        Category::Seo
    }

    async fn detect(
        &self,
        page: &PageRecord,
        live: Option<&dyn LivePage>,
    ) -> Result<Vec<Finding>, DetectorError> {
        if page.depth != 0 {
            return Ok(Vec::new());
        }

        let robots = match live {
            Some(live) => live
                .evaluate(ROBOTS_SCRIPT)
                .await?
                .as_str()
                .unwrap_or_default()
                .to_string(),
            None => named_meta(&page.dom_snapshot, "robots").unwrap_or_default(),
        }
        .to_lowercase();

        if !robots.contains("noindex") {
            return Ok(Vec::new());
        }

        Ok(vec![self
            .finding("noindex_homepage", Severity::Critical, "Homepage is No-Indexed")
            .with_description("The main entry point has a 'noindex' robots meta tag")
            .with_evidence("robots_meta", robots)])
    }
}

/// JSON-LD blocks that do not parse or name no schema type
pub struct StructuredData;

#[async_trait]
impl Detector for StructuredData {
    fn name(&self) -> &'static str {
        "structured_data"
    }

    fn category(&self) -> Category {
        Category::Seo
    }

    async fn detect(
        &self,
        page: &PageRecord,
        live: Option<&dyn LivePage>,
    ) -> Result<Vec<Finding>, DetectorError> {
        let blocks: Vec<String> = match live {
            Some(live) => serde_json::from_value(live.evaluate(JSON_LD_SCRIPT).await?)
                .map_err(|e| DetectorError::Data(e.to_string()))?,
            None => json_ld_blocks(&page.dom_snapshot),
        };

        let findings = blocks
            .iter()
            .filter_map(|text| match serde_json::from_str::<serde_json::Value>(text) {
                Err(e) => Some(
                    self.finding("invalid_json_ld", Severity::High, "Invalid JSON-LD Syntax")
                        .with_description(format!("Structured data failed to parse: {}", e))
                        .with_evidence("json", excerpt(text)),
                ),
                Ok(value) if !has_schema_type(&value) => Some(
                    self.finding("missing_schema_type", Severity::Medium, "Missing Schema Type")
                        .with_description("Structured data JSON-LD is missing '@type'")
                        .with_evidence("json", excerpt(text)),
                ),
                Ok(_) => None,
            })
            .collect();

        Ok(findings)
    }
}
