//! Accessibility detectors

use crate::detector::{Detector, DetectorError, LivePage};
use crate::model::{Category, Finding, PageRecord, Severity};
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::Deserialize;

/// Collects `{src, alt}` for every image in a live document
const IMAGE_SCRIPT: &str = "Array.from(document.images).map(img => ({ \
    src: img.getAttribute('src'), \
    alt: img.getAttribute('alt') \
}))";

#[derive(Debug, Deserialize)]
struct Image {
    src: Option<String>,
    alt: Option<String>,
}

fn images_from_dom(html: &str) -> Vec<Image> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("img") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .map(|img| Image {
            src: img.value().attr("src").map(str::to_string),
            alt: img.value().attr("alt").map(str::to_string),
        })
        .collect()
}

fn looks_like_file_name(alt: &str) -> bool {
    let alt = alt.to_lowercase();
    alt.contains(".jpg") || alt.contains(".png")
}

/// Images without usable alternative text
///
/// Prefers the live document when the renderer offers one, otherwise reads
/// the DOM snapshot.
pub struct MissingAltText;

#[async_trait]
impl Detector for MissingAltText {
    fn name(&self) -> &'static str {
        "missing_alt_text"
    }

    fn category(&self) -> Category {
        Category::Accessibility
    }

    async fn detect(
        &self,
        page: &PageRecord,
        live: Option<&dyn LivePage>,
    ) -> Result<Vec<Finding>, DetectorError> {
        let images = match live {
            Some(live) => {
                let value = live.evaluate(IMAGE_SCRIPT).await?;
                serde_json::from_value::<Vec<Image>>(value)
                    .map_err(|e| DetectorError::Data(e.to_string()))?
            }
            None => images_from_dom(&page.dom_snapshot),
        };

        let mut findings = Vec::new();
        for image in images {
            let src = image.src.unwrap_or_default();
            match image.alt.as_deref() {
                None => findings.push(
                    self.finding("missing_alt", Severity::Critical, "Missing Alt Attribute")
                        .with_description("Image has no alt attribute")
                        .with_selector(format!("img[src=\"{}\"]", src))
                        .with_evidence("src", src),
                ),
                Some(alt) if looks_like_file_name(alt) => findings.push(
                    self.finding("filename_alt", Severity::High, "Filename Used as Alt Text")
                        .with_description(format!("Alt text \"{}\" is a file name", alt))
                        .with_selector(format!("img[src=\"{}\"]", src))
                        .with_evidence("src", src)
                        .with_evidence("alt", alt),
                ),
                Some(_) => {}
            }
        }
        Ok(findings)
    }
}

/// Heading outline problems
pub struct HeadingStructure;

#[async_trait]
impl Detector for HeadingStructure {
    fn name(&self) -> &'static str {
        "heading_structure"
    }

    fn category(&self) -> Category {
        Category::Accessibility
    }

    async fn detect(
        &self,
        page: &PageRecord,
        _live: Option<&dyn LivePage>,
    ) -> Result<Vec<Finding>, DetectorError> {
        let headings = &page.structure.headings;
        let mut findings = Vec::new();

        let h1_count = headings.iter().filter(|h| h.level == 1).count();
        if h1_count == 0 {
            findings.push(
                self.finding("missing_h1", Severity::High, "Missing H1 Heading")
                    .with_description("Page has no top-level heading"),
            );
        } else if h1_count > 1 {
            findings.push(
                self.finding("multiple_h1", Severity::Medium, "Multiple H1 Headings Detected")
                    .with_evidence("count", h1_count),
            );
        }

        for pair in headings.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.level > prev.level + 1 {
                findings.push(
                    self.finding("skipped_level", Severity::Medium, "Skipped Heading Level")
                        .with_description(format!(
                            "h{} \"{}\" follows h{}",
                            next.level, next.text, prev.level
                        ))
                        .with_evidence("from", prev.level)
                        .with_evidence("to", next.level),
                );
            }
        }

        Ok(findings)
    }
}
