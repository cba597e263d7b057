//! Storage module for persisting scan results
//!
//! This module handles all database operations for a scan, including:
//! - SQLite database initialization and schema management
//! - Job lifecycle rows
//! - Page and per-page score persistence
//! - Finding persistence

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{ScanStore, StorageError, StorageResult};

use crate::state::JobStatus;
use std::path::Path;

/// Opens or creates a scan database
pub fn open_store(path: &Path) -> StorageResult<SqliteStore> {
    SqliteStore::new(path)
}

/// Represents a job in the database
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: String,
    pub target_url: String,
    pub config_hash: String,
    pub status: JobStatus,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub pages_crawled: u64,
    pub overall_score: Option<f64>,
    pub error_message: Option<String>,
}
