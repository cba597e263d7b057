//! Configuration module for ReQon
//!
//! This module handles loading, parsing, and validating TOML scan configuration files.
//!
//! # Example
//!
//! ```no_run
//! use reqon_core::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scan.toml")).unwrap();
//! println!("Scan will visit at most {} pages", config.crawl.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{CrawlConfig, DetectorsConfig, OutputConfig, ScanConfig};

// Re-export parser and validation functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{validate, validate_crawl_config, validate_score_weights};
