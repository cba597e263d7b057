//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `FrontierState`: membership of one URL fingerprint in a job's frontier
//! - `JobStatus`: lifecycle of a crawl job

mod frontier_state;
mod job_status;

// Re-export main types
pub use frontier_state::FrontierState;
pub use job_status::JobStatus;
