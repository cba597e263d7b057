use std::fmt;

/// Lifecycle of one crawl job
///
/// `Pending -> Running -> Completed | Failed`. A job only fails on a
/// configuration error or when the renderer cannot start; navigation and
/// ingestion errors still end in `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if moving from `self` to `next` is allowed
    ///
    /// A pending job may fail directly when its configuration is rejected.
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Pending, Self::Failed)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }

    /// Returns `next` if the transition is allowed
    pub fn transition(self, next: Self) -> crate::Result<Self> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(crate::ReqonError::InvalidJobTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
