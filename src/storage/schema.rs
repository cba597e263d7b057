//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the ReQon database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per scan job
CREATE TABLE IF NOT EXISTS jobs (
    id TEXT PRIMARY KEY,
    target_url TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    pages_crawled INTEGER NOT NULL DEFAULT 0,
    overall_score REAL,
    error_message TEXT
);

-- Rendered pages, unique per job by URL fingerprint
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id TEXT NOT NULL REFERENCES jobs(id),
    url TEXT NOT NULL,
    final_url TEXT NOT NULL,
    fingerprint TEXT NOT NULL,
    title TEXT,
    http_status INTEGER NOT NULL,
    depth INTEGER NOT NULL,
    parent_url TEXT,
    overall_score REAL,
    screenshot BLOB,
    crawled_at TEXT NOT NULL,
    UNIQUE(job_id, fingerprint)
);

CREATE INDEX IF NOT EXISTS idx_pages_job ON pages(job_id);

-- Detector findings
CREATE TABLE IF NOT EXISTS issues (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id TEXT NOT NULL REFERENCES jobs(id),
    page_id INTEGER NOT NULL REFERENCES pages(id),
    detector TEXT NOT NULL,
    category TEXT NOT NULL,
    subcategory TEXT NOT NULL,
    severity TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    element_selector TEXT,
    element_html TEXT,
    evidence_json TEXT NOT NULL,
    confidence REAL NOT NULL,
    is_false_positive INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_issues_job ON issues(job_id);
CREATE INDEX IF NOT EXISTS idx_issues_page ON issues(page_id);
"#;

/// Creates every table and index that does not exist yet
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize_schema(&conn).unwrap();
        let result = initialize_schema(&conn);

        assert!(result.is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        for table in ["jobs", "pages", "issues"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }
}
