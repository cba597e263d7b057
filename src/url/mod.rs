//! URL handling module for ReQon
//!
//! This module provides URL normalization, fingerprinting, host extraction,
//! and the same-origin/pattern filter used by the frontier.

mod domain;
mod matcher;
mod normalize;

use crate::UrlResult;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use url::Url;

// Re-export main functions
pub use domain::{extract_host, same_host};
pub use matcher::{Rejection, UrlFilter};
pub use normalize::{normalize_parsed, normalize_url};

/// Stable hash of a normalized URL
///
/// Two URLs that differ only by fragment or trailing slash share a
/// fingerprint. It is the only dedup key the frontier uses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UrlFingerprint(String);

impl UrlFingerprint {
    /// Fingerprints a URL string
    ///
    /// # Examples
    ///
    /// ```
    /// use reqon_core::url::UrlFingerprint;
    ///
    /// let a = UrlFingerprint::of("https://example.com/a/").unwrap();
    /// let b = UrlFingerprint::of("https://example.com/a#top").unwrap();
    /// assert_eq!(a, b);
    /// ```
    pub fn of(url: &str) -> UrlResult<Self> {
        Ok(Self::from_normalized(&normalize_url(url)?))
    }

    /// Fingerprints an already parsed URL
    pub fn of_url(url: &Url) -> UrlResult<Self> {
        Ok(Self::from_normalized(&normalize_parsed(url)?))
    }

    fn from_normalized(normalized: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UrlFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps log lines readable
        write!(f, "{}", &self.0[..12.min(self.0.len())])
    }
}
