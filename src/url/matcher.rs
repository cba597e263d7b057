use super::domain::{extract_host, same_host};
use crate::config::CrawlConfig;
use crate::ConfigError;
use regex::Regex;
use std::fmt;
use url::Url;

/// Why a candidate URL was kept out of the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Not http or https, or no host
    Unsupported,
    /// Host differs from the target's host
    OffSite,
    /// Matched an exclude pattern
    Excluded(String),
    /// Include patterns are set and none matched
    NotIncluded,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported => write!(f, "unsupported url"),
            Self::OffSite => write!(f, "different host"),
            Self::Excluded(p) => write!(f, "excluded by '{}'", p),
            Self::NotIncluded => write!(f, "matches no include pattern"),
        }
    }
}

/// Same-origin and pattern filter applied to every discovered link
///
/// The host check always runs first, so include patterns can never pull an
/// off-site link into the crawl.
#[derive(Debug, Clone)]
pub struct UrlFilter {
    target: Url,
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl UrlFilter {
    /// Builds the filter for one job from its crawl configuration
    pub fn from_config(config: &CrawlConfig) -> Result<Self, ConfigError> {
        let target = Url::parse(&config.target_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", config.target_url, e)))?;

        if extract_host(&target).is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "{}: missing host",
                config.target_url
            )));
        }

        Ok(Self {
            target,
            include: compile_all(&config.include_patterns)?,
            exclude: compile_all(&config.exclude_patterns)?,
        })
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    /// Checks a candidate URL against the host and pattern rules
    pub fn admits(&self, url: &Url) -> Result<(), Rejection> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Rejection::Unsupported);
        }

        if !same_host(&self.target, url) {
            return Err(Rejection::OffSite);
        }

        let candidate = url.as_str();

        if let Some(pattern) = self.exclude.iter().find(|re| re.is_match(candidate)) {
            return Err(Rejection::Excluded(pattern.as_str().to_string()));
        }

        if !self.include.is_empty() && !self.include.iter().any(|re| re.is_match(candidate)) {
            return Err(Rejection::NotIncluded);
        }

        Ok(())
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| ConfigError::InvalidPattern {
                pattern: p.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}
