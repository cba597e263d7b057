use crate::score::ScoreWeights;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration structure for a scan
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub scoring: ScoreWeights,
    #[serde(default)]
    pub detectors: DetectorsConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawl behavior configuration
///
/// Immutable for the lifetime of one job: the scheduler takes its own copy
/// when the job starts.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// Site to scan; also defines the only host that will be crawled
    pub target_url: String,

    /// Maximum number of pages to visit (failed renders count)
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Maximum link depth from the target URL
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum number of pages rendered at the same time
    #[serde(default = "default_concurrent_pages")]
    pub concurrent_pages: u32,

    /// Navigation timeout per page (milliseconds)
    #[serde(default = "default_page_timeout_ms")]
    pub page_timeout_ms: u64,

    /// Time to let the page settle after load (milliseconds)
    #[serde(default = "default_wait_after_load_ms")]
    pub wait_after_load_ms: u64,

    #[serde(default = "default_true")]
    pub respect_robots_txt: bool,

    /// Regexes a URL must match at least one of (empty = everything)
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Regexes that exclude a URL when any of them matches
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    #[serde(default = "default_true")]
    pub capture_screenshots: bool,

    #[serde(default = "default_true")]
    pub capture_network: bool,

    #[serde(default = "default_true")]
    pub capture_console: bool,

    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub extra_headers: BTreeMap<String, String>,
}

impl CrawlConfig {
    /// Creates a configuration for `target_url` with every other field at its default
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            max_pages: default_max_pages(),
            max_depth: default_max_depth(),
            concurrent_pages: default_concurrent_pages(),
            page_timeout_ms: default_page_timeout_ms(),
            wait_after_load_ms: default_wait_after_load_ms(),
            respect_robots_txt: true,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            capture_screenshots: true,
            capture_network: true,
            capture_console: true,
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            user_agent: default_user_agent(),
            extra_headers: BTreeMap::new(),
        }
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }

    pub fn wait_after_load(&self) -> Duration {
        Duration::from_millis(self.wait_after_load_ms)
    }

    /// Validates this configuration; see [`crate::config::validate_crawl_config`]
    pub fn validate(&self) -> crate::ConfigResult<()> {
        super::validation::validate_crawl_config(self)
    }
}

/// Detector selection and tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DetectorsConfig {
    /// Identifiers of the detectors to run (absent = every registered detector)
    #[serde(default)]
    pub enabled: Option<Vec<String>>,

    /// Identifiers removed from the enabled set
    #[serde(default)]
    pub disabled: Vec<String>,

    /// Maximum number of outbound links the link checker tries per page
    #[serde(default = "default_link_check_limit")]
    pub link_check_limit: usize,

    /// Timeout for a single link check (milliseconds)
    #[serde(default = "default_link_check_timeout_ms")]
    pub link_check_timeout_ms: u64,

    /// User agent for link checks (absent = the crawl's user agent)
    #[serde(default)]
    pub link_check_user_agent: Option<String>,
}

impl Default for DetectorsConfig {
    fn default() -> Self {
        Self {
            enabled: None,
            disabled: Vec::new(),
            link_check_limit: default_link_check_limit(),
            link_check_timeout_ms: default_link_check_timeout_ms(),
            link_check_user_agent: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite database file (absent = nothing is persisted)
    #[serde(default)]
    pub database_path: Option<String>,
}

fn default_max_pages() -> u32 {
    100
}

fn default_max_depth() -> u32 {
    5
}

fn default_concurrent_pages() -> u32 {
    3
}

fn default_page_timeout_ms() -> u64 {
    30_000
}

fn default_wait_after_load_ms() -> u64 {
    2_000
}

fn default_true() -> bool {
    true
}

fn default_viewport_width() -> u32 {
    1920
}

fn default_viewport_height() -> u32 {
    1080
}

fn default_user_agent() -> String {
    "ReQon-QA-Bot/1.0".to_string()
}

fn default_link_check_limit() -> usize {
    50
}

fn default_link_check_timeout_ms() -> u64 {
    10_000
}
