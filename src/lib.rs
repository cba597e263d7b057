//! ReQon core: site hygiene scanning
//!
//! This crate crawls a target site breadth-first, runs pluggable quality and
//! defect detectors against every rendered page, folds the findings into a
//! hygiene score, records the link/issue topology as a graph, and streams
//! progress events to any number of observers while it works.

pub mod config;
pub mod crawler;
pub mod detector;
pub mod events;
pub mod graph;
pub mod model;
pub mod pipeline;
pub mod robots;
pub mod score;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for ReQon operations
#[derive(Debug, Error)]
pub enum ReqonError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Renderer start-up failed: {0}")]
    RendererStartup(String),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Graph error: {0}")]
    Graph(#[from] graph::GraphError),

    #[error("Invalid frontier transition for {fingerprint}: {from} -> {to}")]
    InvalidTransition {
        fingerprint: String,
        from: state::FrontierState,
        to: state::FrontierState,
    },

    #[error("Invalid job transition: {from} -> {to}")]
    InvalidJobTransition {
        from: state::JobStatus,
        to: state::JobStatus,
    },

    #[error("Scan task ended without completing: {0}")]
    Aborted(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid URL pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Unknown detector: {0}")]
    UnknownDetector(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for ReQon operations
pub type Result<T> = std::result::Result<T, ReqonError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{CrawlConfig, ScanConfig};
pub use crawler::{start, Renderer, Scheduler};
pub use detector::{Detector, DetectorEngine, DetectorRegistry};
pub use events::{CrawlEvent, EventBus, ProgressMessage};
pub use graph::{GraphStore, MemoryGraph};
pub use model::{Category, Finding, FrontierEntry, PageRecord, Severity};
pub use pipeline::{ScanPipeline, ScanReport};
pub use score::{ScoreEngine, ScoreResult, ScoreWeights};
pub use state::{FrontierState, JobStatus};
pub use url::{normalize_url, UrlFingerprint};
