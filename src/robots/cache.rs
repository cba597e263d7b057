//! Per-renderer robots.txt cache

use crate::robots::{fetch_robots, RobotsRules};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use url::Url;

/// Robots.txt rules keyed by origin (`scheme://host:port`)
///
/// Each origin is fetched at most once while the cache lives. Concurrent
/// misses for the same origin may both fetch; the last one stored wins and
/// both results are identical in practice.
#[derive(Debug, Clone, Default)]
pub struct RobotsCache {
    entries: Arc<Mutex<HashMap<String, RobotsRules>>>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the rules for the origin of `url`, fetching them on first use
    pub async fn rules_for(&self, client: &Client, url: &Url) -> RobotsRules {
        let origin = url.origin().ascii_serialization();

        if let Some(rules) = self.get(&origin) {
            return rules;
        }

        let rules = fetch_robots(client, url).await;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(origin, rules.clone());
        rules
    }

    fn get(&self, origin: &str) -> Option<RobotsRules> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(origin)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
