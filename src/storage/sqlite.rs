//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ScanStore trait.

use crate::model::{Finding, PageRecord};
use crate::state::JobStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ScanStore, StorageError, StorageResult};
use crate::storage::JobRecord;
use crate::url::UrlFingerprint;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens or creates the database at `path` and ensures the schema exists
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn job_status(&self, job_id: &str) -> StorageResult<JobStatus> {
        let status: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM jobs WHERE id = ?1",
                params![job_id],
                |row| row.get(0),
            )
            .optional()?;

        status
            .and_then(|s| JobStatus::from_db_string(&s))
            .ok_or_else(|| StorageError::JobNotFound(job_id.to_string()))
    }

    fn check_transition(&self, job_id: &str, next: JobStatus) -> StorageResult<()> {
        let current = self.job_status(job_id)?;
        if current.can_transition_to(next) {
            Ok(())
        } else {
            Err(StorageError::InvalidTransition {
                job_id: job_id.to_string(),
                from: current,
                to: next,
            })
        }
    }
}

impl ScanStore for SqliteStore {
    // ===== Job Management =====

    fn create_job(
        &mut self,
        job_id: &str,
        target_url: &str,
        config_hash: &str,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO jobs (id, target_url, config_hash, status, started_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![job_id, target_url, config_hash, JobStatus::Pending.to_db_string(), now],
        )?;
        Ok(())
    }

    fn start_job(&mut self, job_id: &str) -> StorageResult<()> {
        self.check_transition(job_id, JobStatus::Running)?;
        self.conn.execute(
            "UPDATE jobs SET status = ?1 WHERE id = ?2",
            params![JobStatus::Running.to_db_string(), job_id],
        )?;
        Ok(())
    }

    fn complete_job(
        &mut self,
        job_id: &str,
        pages_crawled: usize,
        overall_score: f64,
    ) -> StorageResult<()> {
        self.check_transition(job_id, JobStatus::Completed)?;
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE jobs SET status = ?1, finished_at = ?2, pages_crawled = ?3, overall_score = ?4
             WHERE id = ?5",
            params![
                JobStatus::Completed.to_db_string(),
                now,
                pages_crawled as i64,
                overall_score,
                job_id
            ],
        )?;
        Ok(())
    }

    fn fail_job(&mut self, job_id: &str, reason: &str) -> StorageResult<()> {
        self.check_transition(job_id, JobStatus::Failed)?;
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE jobs SET status = ?1, finished_at = ?2, error_message = ?3 WHERE id = ?4",
            params![JobStatus::Failed.to_db_string(), now, reason, job_id],
        )?;
        Ok(())
    }

    fn get_job(&self, job_id: &str) -> StorageResult<JobRecord> {
        let mut stmt = self.conn.prepare(
            "SELECT id, target_url, config_hash, status, started_at, finished_at,
             pages_crawled, overall_score, error_message
             FROM jobs WHERE id = ?1",
        )?;

        let job = stmt
            .query_row(params![job_id], |row| {
                Ok(JobRecord {
                    id: row.get(0)?,
                    target_url: row.get(1)?,
                    config_hash: row.get(2)?,
                    status: JobStatus::from_db_string(&row.get::<_, String>(3)?)
                        .unwrap_or(JobStatus::Failed),
                    started_at: row.get(4)?,
                    finished_at: row.get(5)?,
                    pages_crawled: row.get::<_, i64>(6)? as u64,
                    overall_score: row.get(7)?,
                    error_message: row.get(8)?,
                })
            })
            .optional()?;

        job.ok_or_else(|| StorageError::JobNotFound(job_id.to_string()))
    }

    // ===== Pages and Issues =====

    fn record_page(&mut self, job_id: &str, page: &PageRecord) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO pages (job_id, url, final_url, fingerprint, title, http_status, depth,
                parent_url, screenshot, crawled_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(job_id, fingerprint) DO UPDATE SET
                url = excluded.url,
                final_url = excluded.final_url,
                title = excluded.title,
                http_status = excluded.http_status,
                screenshot = excluded.screenshot,
                crawled_at = excluded.crawled_at",
            params![
                job_id,
                page.url,
                page.final_url,
                page.fingerprint.as_str(),
                page.title,
                page.http_status,
                page.depth,
                page.parent_url,
                page.screenshot,
                page.crawled_at.to_rfc3339()
            ],
        )?;

        let id = self.conn.query_row(
            "SELECT id FROM pages WHERE job_id = ?1 AND fingerprint = ?2",
            params![job_id, page.fingerprint.as_str()],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn get_page_screenshot(
        &self,
        job_id: &str,
        fingerprint: &UrlFingerprint,
    ) -> StorageResult<Option<Vec<u8>>> {
        let screenshot: Option<Option<Vec<u8>>> = self
            .conn
            .query_row(
                "SELECT screenshot FROM pages WHERE job_id = ?1 AND fingerprint = ?2",
                params![job_id, fingerprint.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(screenshot.flatten())
    }

    fn record_page_score(&mut self, page_id: i64, overall_score: f64) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE pages SET overall_score = ?1 WHERE id = ?2",
            params![overall_score, page_id],
        )?;
        Ok(())
    }

    fn record_issues(
        &mut self,
        job_id: &str,
        page_id: i64,
        findings: &[Finding],
    ) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO issues (job_id, page_id, detector, category, subcategory, severity,
                 title, description, element_selector, element_html, evidence_json, confidence,
                 is_false_positive)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            )?;

            for finding in findings {
                let evidence = serde_json::to_string(&finding.evidence)?;
                stmt.execute(params![
                    job_id,
                    page_id,
                    finding.detector,
                    finding.category.as_str(),
                    finding.subcategory,
                    finding.severity.as_str(),
                    finding.title,
                    finding.description,
                    finding.element_selector,
                    finding.element_html,
                    evidence,
                    finding.confidence,
                    finding.is_false_positive
                ])?;
            }
        }
        tx.commit()?;
        Ok(findings.len())
    }

    // ===== Statistics =====

    fn count_pages(&self, job_id: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE job_id = ?1",
            params![job_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_issues(&self, job_id: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM issues WHERE job_id = ?1",
            params![job_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
