//! Robots.txt rule matching on top of the robotstxt crate

use robotstxt::DefaultMatcher;

/// Robots.txt rules for one host
#[derive(Debug, Clone, Default)]
pub struct RobotsRules {
    /// Raw robots.txt body; empty allows everything
    content: String,
}

impl RobotsRules {
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// Rules that allow every URL
    ///
    /// Used when robots.txt is missing or cannot be fetched.
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn is_allow_all(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Checks whether `user_agent` may fetch the absolute `url`
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.is_allow_all() {
            return true;
        }

        // Matching is done against the product token only
        let agent = user_agent.split('/').next().unwrap_or(user_agent);

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, agent, url)
    }
}
