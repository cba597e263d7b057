use crate::url::UrlFingerprint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A crawl candidate that survived admission
///
/// Consumed exactly once by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontierEntry {
    pub url: String,
    pub fingerprint: UrlFingerprint,
    pub depth: u32,
    pub parent_url: Option<String>,
}

/// One rendered page and everything extracted from it
///
/// Built once per successful render and shared read-only with the detector
/// engine, the score engine, and the graph adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    /// URL as dispatched from the frontier; the page's identity
    pub url: String,
    /// URL the page was served from after redirects
    pub final_url: String,
    pub fingerprint: UrlFingerprint,
    pub title: String,
    pub http_status: u16,
    pub depth: u32,
    pub parent_url: Option<String>,
    /// Raw DOM or response body
    #[serde(skip_serializing, default)]
    pub dom_snapshot: String,
    pub structure: PageStructure,
    pub console: Vec<ConsoleEntry>,
    pub network: Vec<NetworkEntry>,
    pub performance: PerformanceMetrics,
    pub links: Vec<String>,
    pub forms: Vec<FormDescriptor>,
    /// PNG capture, when screenshots are enabled and the renderer takes them
    #[serde(skip)]
    pub screenshot: Option<Vec<u8>>,
    pub crawled_at: DateTime<Utc>,
}

impl PageRecord {
    /// Returns the network entry for the main document, if recorded
    pub fn document_entry(&self) -> Option<&NetworkEntry> {
        self.network
            .iter()
            .find(|entry| entry.resource_type == ResourceType::Document)
    }

    pub fn is_https(&self) -> bool {
        self.final_url.starts_with("https://")
    }

    pub fn was_redirected(&self) -> bool {
        self.final_url != self.url
    }
}

/// Structural summary of the DOM
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageStructure {
    pub headings: Vec<Heading>,
    pub image_count: usize,
    /// Input elements by `type` attribute (`text` when absent)
    pub input_types: BTreeMap<String, usize>,
    pub total_elements: usize,
    /// Length of the visible body text
    pub text_length: usize,
    pub has_nav: bool,
    pub has_table: bool,
    pub has_form: bool,
}

impl PageStructure {
    pub fn heading_count(&self) -> usize {
        self.headings.len()
    }

    pub fn input_count(&self) -> usize {
        self.input_types.values().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    /// 1 to 6
    pub level: u8,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Error,
    Warning,
    Info,
    Log,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleEntry {
    pub level: ConsoleLevel,
    pub text: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Document,
    Script,
    Stylesheet,
    Image,
    Frame,
    Xhr,
    Other,
}

/// One request made while rendering the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkEntry {
    pub url: String,
    pub method: String,
    /// Absent when only the reference was seen
    pub status: Option<u16>,
    pub resource_type: ResourceType,
    /// Response headers, lowercase names
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl NetworkEntry {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Timings in milliseconds; absent when the renderer could not measure them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub ttfb_ms: Option<f64>,
    pub load_time_ms: Option<f64>,
    pub lcp_ms: Option<f64>,
    pub fid_ms: Option<f64>,
    pub cls: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormDescriptor {
    pub id: Option<String>,
    pub action: Option<String>,
    pub method: String,
    pub inputs: Vec<FormInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormInput {
    pub name: Option<String>,
    pub input_type: String,
    pub required: bool,
}
