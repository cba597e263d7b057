//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::model::{Finding, PageRecord};
use crate::state::JobStatus;
use crate::storage::JobRecord;
use crate::url::UrlFingerprint;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job {job_id} cannot move from {from} to {to}")]
    InvalidTransition {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence port for scan results
///
/// Job status changes follow [`JobStatus`] transitions; an illegal move is an
/// error and leaves the row unchanged.
pub trait ScanStore: Send {
    // ===== Job Management =====

    /// Creates a pending job row
    ///
    /// # Arguments
    ///
    /// * `job_id` - Caller-chosen identifier, unique per database
    /// * `target_url` - Seed URL of the scan
    /// * `config_hash` - Hash of the configuration file the job runs with
    ///
    /// # Returns
    ///
    /// `Ok(())` once the row exists; a duplicate `job_id` is an SQLite error.
    fn create_job(&mut self, job_id: &str, target_url: &str, config_hash: &str)
        -> StorageResult<()>;

    /// Moves a pending job to running
    fn start_job(&mut self, job_id: &str) -> StorageResult<()>;

    /// Marks a running job completed with its final tallies
    ///
    /// # Arguments
    ///
    /// * `job_id` - Job to complete
    /// * `pages_crawled` - Pages rendered and analysed
    /// * `overall_score` - Job score in `[0, 100]`
    ///
    /// # Returns
    ///
    /// [`StorageError::InvalidTransition`] unless the job is running, and
    /// [`StorageError::JobNotFound`] for an unknown id.
    fn complete_job(
        &mut self,
        job_id: &str,
        pages_crawled: usize,
        overall_score: f64,
    ) -> StorageResult<()>;

    /// Marks a job failed with the reason
    fn fail_job(&mut self, job_id: &str, reason: &str) -> StorageResult<()>;

    fn get_job(&self, job_id: &str) -> StorageResult<JobRecord>;

    // ===== Pages and Issues =====

    /// Inserts or updates a page
    ///
    /// Pages are unique per job by fingerprint, so recording the same page
    /// twice updates the first row. The screenshot is stored when present.
    ///
    /// # Arguments
    ///
    /// * `job_id` - Job the page belongs to
    /// * `page` - The rendered page
    ///
    /// # Returns
    ///
    /// The page's row id, used to attach scores and issues.
    fn record_page(&mut self, job_id: &str, page: &PageRecord) -> StorageResult<i64>;

    /// Screenshot stored for a page
    ///
    /// # Returns
    ///
    /// `None` when the page is unknown or was recorded without one.
    fn get_page_screenshot(
        &self,
        job_id: &str,
        fingerprint: &UrlFingerprint,
    ) -> StorageResult<Option<Vec<u8>>>;

    fn record_page_score(&mut self, page_id: i64, overall_score: f64) -> StorageResult<()>;

    /// Stores findings for a page in one transaction
    ///
    /// # Arguments
    ///
    /// * `job_id` - Job the page belongs to
    /// * `page_id` - Row id from [`ScanStore::record_page`]
    /// * `findings` - Findings to append; false positives are stored flagged
    ///
    /// # Returns
    ///
    /// How many rows were written. On error none are.
    fn record_issues(
        &mut self,
        job_id: &str,
        page_id: i64,
        findings: &[Finding],
    ) -> StorageResult<usize>;

    // ===== Statistics =====

    fn count_pages(&self, job_id: &str) -> StorageResult<u64>;

    fn count_issues(&self, job_id: &str) -> StorageResult<u64>;
}
