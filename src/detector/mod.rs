//! Detector plugins
//!
//! A detector inspects one page and reports [`Finding`]s. Detectors are
//! registered by identifier in a [`DetectorRegistry`]; the
//! [`DetectorEngine`] built from it runs them all against each page and
//! isolates their failures from one another.

pub mod builtin;
mod engine;
mod registry;

pub use engine::DetectorEngine;
pub use registry::{Constructor, DetectorRegistry, BUILTIN_IDS};

use crate::model::{Category, Finding, PageRecord, Severity};
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised inside a detector
///
/// The engine logs these and drops that detector's output for the page.
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Live page evaluation failed: {0}")]
    Evaluation(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Unexpected data: {0}")]
    Data(String),
}

/// Handle to a page that is still open in the renderer
///
/// Only renderers that keep a live document (a browser) can offer one.
#[async_trait]
pub trait LivePage: Send + Sync {
    /// Evaluates a script in the page and returns its JSON result
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, DetectorError>;
}

/// A stateless page check
///
/// Implementations must not keep mutable state between calls: the same page
/// always yields the same findings, whatever order detectors run in.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Registry identifier, also recorded on every finding
    fn name(&self) -> &'static str;

    fn category(&self) -> Category;

    async fn detect(
        &self,
        page: &PageRecord,
        live: Option<&dyn LivePage>,
    ) -> Result<Vec<Finding>, DetectorError>;

    /// Starts a finding attributed to this detector
    fn finding(&self, subcategory: &str, severity: Severity, title: impl Into<String>) -> Finding
    where
        Self: Sized,
    {
        Finding::new(self.name(), self.category(), subcategory, severity, title)
    }
}
