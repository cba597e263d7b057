/// Frontier membership states for a single URL fingerprint
use std::fmt;

/// Where a fingerprint is in its life inside one job's frontier
///
/// `Discovered -> Dispatched -> Visited | Failed`. Every fingerprint with a
/// state belongs to the discovered set; `Visited` and `Failed` together form
/// the visited set that `max_pages` is counted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontierState {
    // ===== Active States =====
    /// Admitted to the frontier and waiting in the queue
    Discovered,

    /// Handed to the renderer, result not yet folded back
    Dispatched,

    // ===== Terminal States =====
    /// Rendered successfully
    Visited,

    /// Render failed; never retried within the job
    Failed,
}

impl FrontierState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Visited | Self::Failed)
    }

    /// Returns true if the fingerprint counts against `max_pages`
    pub fn counts_as_visited(&self) -> bool {
        self.is_terminal()
    }

    /// Returns true if moving from `self` to `next` is allowed
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Discovered, Self::Dispatched)
                | (Self::Dispatched, Self::Visited)
                | (Self::Dispatched, Self::Failed)
        )
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Dispatched => "dispatched",
            Self::Visited => "visited",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "discovered" => Some(Self::Discovered),
            "dispatched" => Some(Self::Dispatched),
            "visited" => Some(Self::Visited),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for FrontierState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
