use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Severity of a finding, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|sev| sev.as_str() == s)
            .ok_or_else(|| format!("unknown severity '{}'", s))
    }
}

/// Area of site hygiene a finding belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Security,
    Functional,
    Performance,
    Accessibility,
    Ui,
    Seo,
    Content,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Security,
        Category::Functional,
        Category::Performance,
        Category::Accessibility,
        Category::Ui,
        Category::Seo,
        Category::Content,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Security => "security",
            Self::Functional => "functional",
            Self::Performance => "performance",
            Self::Accessibility => "accessibility",
            Self::Ui => "ui",
            Self::Seo => "seo",
            Self::Content => "content",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|cat| cat.as_str() == s)
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}

/// One detector-produced observation about a page
///
/// Built once by a detector and not changed afterwards, apart from the
/// false-positive flag which only an enrichment step may set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub detector: String,
    pub category: Category,
    pub subcategory: String,
    pub severity: Severity,
    pub title: String,
    pub description: Option<String>,
    pub element_selector: Option<String>,
    pub element_html: Option<String>,
    #[serde(default)]
    pub evidence: Map<String, Value>,
    #[serde(default)]
    pub is_false_positive: bool,
    /// 0.0 to 1.0
    pub confidence: f64,
}

impl Finding {
    pub fn new(
        detector: &str,
        category: Category,
        subcategory: &str,
        severity: Severity,
        title: impl Into<String>,
    ) -> Self {
        Self {
            detector: detector.to_string(),
            category,
            subcategory: subcategory.to_string(),
            severity,
            title: title.into(),
            description: None,
            element_selector: None,
            element_html: None,
            evidence: Map::new(),
            is_false_positive: false,
            confidence: 1.0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.element_selector = Some(selector.into());
        self
    }

    /// Attaches an HTML snippet, cut to 500 characters
    pub fn with_html(mut self, html: &str) -> Self {
        self.element_html = Some(html.chars().take(500).collect());
        self
    }

    pub fn with_evidence(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.evidence.insert(key.to_string(), value.into());
        self
    }

    /// Sets the confidence, clamped to [0, 1]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn mark_false_positive(&mut self) {
        self.is_false_positive = true;
    }
}
