//! HTML parser for extracting links, forms, and page structure
//!
//! This module handles parsing HTML content to extract:
//! - Outbound links to offer to the frontier
//! - Page title
//! - Form descriptors
//! - A structural summary of the DOM
//! - Sub-resource references (scripts, stylesheets, images, frames)

use crate::model::{FormDescriptor, FormInput, Heading, PageStructure, ResourceType};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    pub title: Option<String>,

    /// Absolute http(s) links, deduplicated, first occurrence order
    pub links: Vec<String>,

    pub forms: Vec<FormDescriptor>,

    pub structure: PageStructure,

    /// Absolute URLs of referenced sub-resources
    pub subresources: Vec<(String, ResourceType)>,
}

/// Parses HTML content
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links
///
/// # Example
///
/// ```
/// use reqon_core::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        links: extract_links(&document, base_url),
        forms: extract_forms(&document),
        structure: extract_structure(&document),
        subresources: extract_subresources(&document, base_url),
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = selector("title")?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let mut push = |href: &str| {
        if let Some(absolute) = resolve_link(href, base_url) {
            if seen.insert(absolute.clone()) {
                links.push(absolute);
            }
        }
    };

    if let Some(a_selector) = selector("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    if let Some(canonical_selector) = selector("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    links
}

/// Resolves a link href to an absolute http(s) URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only anchors
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute.to_string()),
        _ => None,
    }
}

fn extract_forms(document: &Html) -> Vec<FormDescriptor> {
    let (Some(form_selector), Some(input_selector)) =
        (selector("form"), selector("input, select, textarea"))
    else {
        return Vec::new();
    };

    document
        .select(&form_selector)
        .map(|form| {
            let attr = |name: &str| form.value().attr(name).map(str::to_string);
            let inputs = form
                .select(&input_selector)
                .map(|input| FormInput {
                    name: input
                        .value()
                        .attr("name")
                        .map(str::trim)
                        .filter(|n| !n.is_empty())
                        .map(str::to_string),
                    input_type: input_type(&input),
                    required: input.value().attr("required").is_some(),
                })
                .collect();

            FormDescriptor {
                id: attr("id"),
                action: attr("action"),
                method: attr("method")
                    .map(|m| m.to_ascii_uppercase())
                    .unwrap_or_else(|| "GET".to_string()),
                inputs,
            }
        })
        .collect()
}

fn input_type(element: &ElementRef) -> String {
    match element.value().name() {
        "input" => element
            .value()
            .attr("type")
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "text".to_string()),
        other => other.to_string(),
    }
}

fn extract_structure(document: &Html) -> PageStructure {
    let mut structure = PageStructure::default();

    if let Some(heading_selector) = selector("h1, h2, h3, h4, h5, h6") {
        structure.headings = document
            .select(&heading_selector)
            .filter_map(|h| {
                let level = h.value().name().strip_prefix('h')?.parse::<u8>().ok()?;
                let text = h.text().collect::<Vec<_>>().join(" ");
                Some(Heading {
                    level,
                    text: text.split_whitespace().collect::<Vec<_>>().join(" "),
                })
            })
            .collect();
    }

    let count = |css: &str| selector(css).map_or(0, |s| document.select(&s).count());

    structure.image_count = count("img");
    structure.total_elements = count("*");
    structure.has_nav = count("nav, [role='navigation']") > 0;
    structure.has_table = count("table") > 0;
    structure.has_form = count("form") > 0;

    if let Some(input_selector) = selector("input") {
        for input in document.select(&input_selector) {
            *structure.input_types.entry(input_type(&input)).or_insert(0) += 1;
        }
    }

    structure.text_length = visible_text(document).chars().count();
    structure
}

/// Body text without script/style content, whitespace collapsed
pub fn visible_text(document: &Html) -> String {
    let Some(body_selector) = selector("body") else {
        return String::new();
    };
    let Some(body) = document.select(&body_selector).next() else {
        return String::new();
    };

    let mut words = Vec::new();
    for node in body.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|p| p.value().as_element().map(|e| e.name()))
            .map_or(false, |name| matches!(name, "script" | "style" | "noscript" | "template"));
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }
    words.join(" ")
}

fn extract_subresources(document: &Html, base_url: &Url) -> Vec<(String, ResourceType)> {
    let sources = [
        ("script[src]", "src", ResourceType::Script),
        ("link[rel~='stylesheet'][href]", "href", ResourceType::Stylesheet),
        ("img[src]", "src", ResourceType::Image),
        ("iframe[src]", "src", ResourceType::Frame),
    ];

    let mut resources = Vec::new();
    for (css, attr, kind) in sources {
        let Some(sel) = selector(css) else {
            continue;
        };
        for element in document.select(&sel) {
            if let Some(url) = element.value().attr(attr).and_then(|v| resolve_link(v, base_url)) {
                resources.push((url, kind));
            }
        }
    }
    resources
}
