//! URL frontier for one crawl job
//!
//! Owned by the scheduler alone. Render tasks never see it; they hand back
//! links which the scheduler offers here between completions.

use crate::model::FrontierEntry;
use crate::state::FrontierState;
use crate::url::{Rejection, UrlFilter, UrlFingerprint};
use crate::{ReqonError, UrlError};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use url::Url;

/// Why [`Frontier::offer`] turned a link away
#[derive(Debug)]
pub enum Skip {
    Invalid(UrlError),
    /// Fingerprint already discovered; the first discoverer keeps it
    AlreadyKnown,
    TooDeep,
    Filtered(Rejection),
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(e) => write!(f, "invalid: {}", e),
            Self::AlreadyKnown => write!(f, "already discovered"),
            Self::TooDeep => write!(f, "beyond max depth"),
            Self::Filtered(r) => write!(f, "filtered: {}", r),
        }
    }
}

/// FIFO queue plus fingerprint bookkeeping
///
/// The state map doubles as the discovered set (every key) and the visited
/// set (keys in a terminal state). Redirect targets claimed by a visited
/// entry are kept apart in `aliases`: they block later links but are not
/// counted as discovered or visited.
#[derive(Debug)]
pub struct Frontier {
    filter: UrlFilter,
    max_depth: u32,
    queue: VecDeque<FrontierEntry>,
    states: HashMap<UrlFingerprint, FrontierState>,
    aliases: HashSet<UrlFingerprint>,
    visited: usize,
    failed: usize,
}

impl Frontier {
    pub fn new(filter: UrlFilter, max_depth: u32) -> Self {
        Self {
            filter,
            max_depth,
            queue: VecDeque::new(),
            states: HashMap::new(),
            aliases: HashSet::new(),
            visited: 0,
            failed: 0,
        }
    }

    /// Admits the target URL at depth 0
    ///
    /// The seed skips the pattern filter but is registered like any other
    /// fingerprint, so later links back to it are deduplicated.
    pub fn seed(&mut self, url: &str) -> Result<FrontierEntry, UrlError> {
        let fingerprint = UrlFingerprint::of(url)?;
        let entry = FrontierEntry {
            url: url.to_string(),
            fingerprint: fingerprint.clone(),
            depth: 0,
            parent_url: None,
        };
        self.states.insert(fingerprint, FrontierState::Discovered);
        self.queue.push_back(entry.clone());
        Ok(entry)
    }

    /// Offers a discovered link found on `parent_url`
    ///
    /// Checks run in order: dedup, depth, host and patterns. Only admitted
    /// links are registered.
    ///
    /// # Arguments
    ///
    /// * `link` - Absolute URL as found on the page
    /// * `depth` - Depth the link would be crawled at
    /// * `parent_url` - Page the link was found on
    ///
    /// # Returns
    ///
    /// * `Ok(FrontierEntry)` - The queued entry
    /// * `Err(Skip)` - Why the link was turned away
    pub fn offer(
        &mut self,
        link: &str,
        depth: u32,
        parent_url: &str,
    ) -> Result<FrontierEntry, Skip> {
        let url = Url::parse(link).map_err(|e| Skip::Invalid(UrlError::Parse(e.to_string())))?;
        let fingerprint = UrlFingerprint::of_url(&url).map_err(Skip::Invalid)?;

        if self.is_known(&fingerprint) {
            return Err(Skip::AlreadyKnown);
        }

        if depth > self.max_depth {
            return Err(Skip::TooDeep);
        }

        self.filter.admits(&url).map_err(Skip::Filtered)?;

        let entry = FrontierEntry {
            url: link.to_string(),
            fingerprint: fingerprint.clone(),
            depth,
            parent_url: Some(parent_url.to_string()),
        };
        self.states.insert(fingerprint, FrontierState::Discovered);
        self.queue.push_back(entry.clone());
        Ok(entry)
    }

    /// Claims the target of a redirect for the entry that followed it
    ///
    /// # Arguments
    ///
    /// * `final_url` - Where the render ended up
    /// * `fingerprint` - Fingerprint of `final_url`, already known to differ
    ///   from the dispatched entry's
    ///
    /// # Returns
    ///
    /// `Ok` once the target is registered, so no later link renders it
    /// again. [`Skip::AlreadyKnown`] when another entry owns the target and
    /// [`Skip::Filtered`] when the target is out of scope; either way the
    /// caller must not treat the render as a page.
    pub fn claim_redirect(
        &mut self,
        final_url: &str,
        fingerprint: &UrlFingerprint,
    ) -> Result<(), Skip> {
        if self.is_known(fingerprint) {
            return Err(Skip::AlreadyKnown);
        }

        let url =
            Url::parse(final_url).map_err(|e| Skip::Invalid(UrlError::Parse(e.to_string())))?;
        self.filter.admits(&url).map_err(Skip::Filtered)?;

        self.aliases.insert(fingerprint.clone());
        Ok(())
    }

    fn is_known(&self, fingerprint: &UrlFingerprint) -> bool {
        self.states.contains_key(fingerprint) || self.aliases.contains(fingerprint)
    }

    /// Takes up to `limit` entries from the head that share the head's depth
    ///
    /// Every returned entry is moved to `Dispatched`.
    ///
    /// # Returns
    ///
    /// The batch in FIFO order; empty once the queue is exhausted.
    pub fn next_batch(&mut self, limit: usize) -> Vec<FrontierEntry> {
        let mut batch = Vec::with_capacity(limit);
        let mut batch_depth = None;

        while batch.len() < limit {
            let head_depth = match self.queue.front() {
                Some(entry) => entry.depth,
                None => break,
            };
            if batch_depth.map_or(false, |d| d != head_depth) {
                break;
            }

            let Some(entry) = self.queue.pop_front() else {
                break;
            };

            match self.states.get_mut(&entry.fingerprint) {
                Some(state @ FrontierState::Discovered) => {
                    *state = FrontierState::Dispatched;
                    batch_depth = Some(head_depth);
                    batch.push(entry);
                }
                _ => {
                    tracing::debug!("Skipping already dispatched entry {}", entry.url);
                }
            }
        }

        batch
    }

    /// Records the outcome of a dispatched entry
    ///
    /// # Arguments
    ///
    /// * `fingerprint` - Entry previously returned by [`Frontier::next_batch`]
    /// * `next` - `Visited` or `Failed`
    ///
    /// # Returns
    ///
    /// [`ReqonError::InvalidTransition`] when the entry is not dispatched or
    /// `next` is not terminal.
    pub fn complete(
        &mut self,
        fingerprint: &UrlFingerprint,
        next: FrontierState,
    ) -> crate::Result<()> {
        let current = self
            .states
            .get(fingerprint)
            .copied()
            .unwrap_or(FrontierState::Discovered);

        if current != FrontierState::Dispatched || !current.can_transition_to(next) {
            return Err(ReqonError::InvalidTransition {
                fingerprint: fingerprint.to_string(),
                from: current,
                to: next,
            });
        }

        self.states.insert(fingerprint.clone(), next);
        match next {
            FrontierState::Visited => self.visited += 1,
            FrontierState::Failed => self.failed += 1,
            _ => {}
        }
        Ok(())
    }

    pub fn state(&self, fingerprint: &UrlFingerprint) -> Option<FrontierState> {
        self.states.get(fingerprint).copied()
    }

    /// Fingerprints in `Visited` or `Failed`
    pub fn visited_count(&self) -> usize {
        self.visited + self.failed
    }

    pub fn failed_count(&self) -> usize {
        self.failed
    }

    pub fn discovered_count(&self) -> usize {
        self.states.len()
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
