use crate::config::types::{CrawlConfig, DetectorsConfig, ScanConfig};
use crate::detector::DetectorRegistry;
use crate::score::ScoreWeights;
use crate::ConfigError;
use regex::Regex;
use reqwest::header::{HeaderName, HeaderValue};
use url::Url;

/// Upper bound on concurrently rendered pages for one job
const MAX_CONCURRENT_PAGES: u32 = 64;

/// Validates the entire configuration
pub fn validate(config: &ScanConfig) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_score_weights(&config.scoring)?;
    validate_detectors_config(&config.detectors)?;
    Ok(())
}

/// Validates crawl configuration
///
/// Called again by the scheduler before the first render, so a job built
/// from a hand-made `CrawlConfig` fails just as fast as one loaded from disk.
pub fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    let target = Url::parse(&config.target_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid target_url '{}': {}", config.target_url, e))
    })?;

    if target.scheme() != "http" && target.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "target_url must use http or https, got '{}'",
            target.scheme()
        )));
    }

    if target.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::InvalidUrl(format!(
            "target_url '{}' has no host",
            config.target_url
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.concurrent_pages < 1 || config.concurrent_pages > MAX_CONCURRENT_PAGES {
        return Err(ConfigError::Validation(format!(
            "concurrent_pages must be between 1 and {}, got {}",
            MAX_CONCURRENT_PAGES, config.concurrent_pages
        )));
    }

    if config.page_timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "page_timeout_ms must be >= 1".to_string(),
        ));
    }

    if config.viewport_width == 0 || config.viewport_height == 0 {
        return Err(ConfigError::Validation(format!(
            "viewport must be non-zero, got {}x{}",
            config.viewport_width, config.viewport_height
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    for pattern in config.include_patterns.iter().chain(&config.exclude_patterns) {
        validate_pattern(pattern)?;
    }

    for (name, value) in &config.extra_headers {
        HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            ConfigError::Validation(format!("Invalid header name '{}': {}", name, e))
        })?;
        HeaderValue::from_str(value).map_err(|e| {
            ConfigError::Validation(format!("Invalid value for header '{}': {}", name, e))
        })?;
    }

    Ok(())
}

/// Validates a URL include/exclude pattern
fn validate_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern {
            pattern: String::new(),
            message: "pattern cannot be empty".to_string(),
        });
    }

    Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    Ok(())
}

/// Validates score weight tables
pub fn validate_score_weights(weights: &ScoreWeights) -> Result<(), ConfigError> {
    for (severity, weight) in &weights.severity_weights {
        if !weight.is_finite() || *weight < 0.0 {
            return Err(ConfigError::Validation(format!(
                "severity weight for '{}' must be a non-negative number, got {}",
                severity, weight
            )));
        }
    }

    for (category, weight) in &weights.category_weights {
        if !weight.is_finite() || *weight < 0.0 {
            return Err(ConfigError::Validation(format!(
                "category weight for '{}' must be a non-negative number, got {}",
                category, weight
            )));
        }
    }

    Ok(())
}

/// Validates detector selection against the built-in registry
fn validate_detectors_config(config: &DetectorsConfig) -> Result<(), ConfigError> {
    let known = DetectorRegistry::builtin_ids();
    let selected = config.enabled.iter().flatten().chain(&config.disabled);

    for id in selected {
        if !known.contains(&id.as_str()) {
            return Err(ConfigError::UnknownDetector(id.clone()));
        }
    }

    if config.link_check_timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "link_check_timeout_ms must be >= 1".to_string(),
        ));
    }

    Ok(())
}
