//! Robots.txt handling module
//!
//! Fetches, caches, and evaluates robots.txt for the HTTP renderer.

mod cache;
mod parser;

pub use cache::RobotsCache;
pub use parser::RobotsRules;

use reqwest::Client;
use url::Url;

/// Fetches robots.txt for the origin of `url`
///
/// Any failure (network error, non-success status, unreadable body) yields
/// allow-all rules; a missing robots.txt never blocks a scan.
pub async fn fetch_robots(client: &Client, url: &Url) -> RobotsRules {
    let robots_url = match url.join("/robots.txt") {
        Ok(u) => u,
        Err(e) => {
            tracing::debug!("Cannot build robots.txt URL for {}: {}", url, e);
            return RobotsRules::allow_all();
        }
    };

    let response = match client.get(robots_url.as_str()).send().await {
        Ok(r) => r,
        Err(e) => {
            tracing::debug!("Failed to fetch {}: {}", robots_url, e);
            return RobotsRules::allow_all();
        }
    };

    if !response.status().is_success() {
        tracing::debug!("{} returned {}", robots_url, response.status());
        return RobotsRules::allow_all();
    }

    match response.text().await {
        Ok(body) => {
            tracing::debug!("Loaded robots.txt from {}", robots_url);
            RobotsRules::from_content(&body)
        }
        Err(e) => {
            tracing::debug!("Failed to read {}: {}", robots_url, e);
            RobotsRules::allow_all()
        }
    }
}
