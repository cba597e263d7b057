use crate::config::types::ScanConfig;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a scan configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(ScanConfig)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<ScanConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
///
/// # Arguments
///
/// * `content` - TOML document with `[crawl]`, `[scoring]`, `[detectors]`
///   and `[output]` tables; only `crawl.target-url` is required
///
/// # Returns
///
/// * `Ok(ScanConfig)` - Parsed configuration with defaults filled in
/// * `Err(ConfigError)` - TOML syntax error or a value that fails validation
///
/// # Examples
///
/// ```
/// use reqon_core::config::parse_config;
///
/// let config = parse_config("[crawl]\ntarget-url = \"https://example.com/\"\n").unwrap();
/// assert_eq!(config.crawl.max_pages, 100);
/// assert!(config.detectors.link_check_user_agent.is_none());
///
/// assert!(parse_config("[crawl]\nmax-pages = 5\n").is_err());
/// ```
pub fn parse_config(content: &str) -> Result<ScanConfig, ConfigError> {
    let config: ScanConfig = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Stored with each job so results can be traced back to the exact
/// configuration that produced them.
///
/// # Returns
///
/// The lowercase hex digest of the raw file bytes.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok((ScanConfig, String))` - The validated configuration and the hex
///   SHA-256 of the file it came from
/// * `Err(ConfigError)` - As for [`load_config`]
pub fn load_config_with_hash(path: &Path) -> Result<(ScanConfig, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
