//! SQLite link graph implementation
//!
//! This module provides a SQLite-based implementation of the LinkGraphStore
//! trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{BacklinkRow, LinkGraphStore, StoreError, StoreResult};
use crate::storage::{ScanRecord, UrlRecord, MAX_REDIRECT_HOPS, TRANSPORT_ERROR_STATUS};
use crate::url::url_hash;
use crate::LinkscanError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use url::Url;

/// SQLite link graph backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Creates a new SqliteStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(LinkscanError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, LinkscanError> {
        let conn = Connection::open(path).map_err(StoreError::from)?;

        // Configure SQLite for concurrent worker access
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )
        .map_err(StoreError::from)?;

        // Initialize schema
        initialize_schema(&conn).map_err(StoreError::from)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database, used by tests
    pub fn new_in_memory() -> Result<Self, LinkscanError> {
        let conn = Connection::open_in_memory().map_err(StoreError::from)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(StoreError::from)?;
        initialize_schema(&conn).map_err(StoreError::from)?;
        Ok(Self { conn })
    }

    fn scan_from_row(row: &Row<'_>) -> rusqlite::Result<ScanRecord> {
        Ok(ScanRecord {
            scan_id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            seed_url: row.get(3)?,
            host_pattern: row.get(4)?,
            path_pattern: row.get(5)?,
            config_hash: row.get(6)?,
            started_at: row.get(7)?,
            ended_at: row.get(8)?,
        })
    }

    fn url_from_row(row: &Row<'_>) -> rusqlite::Result<UrlRecord> {
        Ok(UrlRecord {
            url_id: row.get(0)?,
            scan_id: row.get(1)?,
            url_hash: row.get(2)?,
            url_text: row.get(3)?,
            hostname: row.get(4)?,
            root_stem: row.get(5)?,
            is_crawled: row.get::<_, i64>(6)? != 0,
            is_blacklisted: row.get::<_, i64>(7)? != 0,
            next_url_id: row.get(8)?,
            status_code: row.get(9)?,
            content_type: row.get(10)?,
            page_title: row.get(11)?,
            created_at: row.get(12)?,
            crawled_at: row.get(13)?,
        })
    }

    fn select_url(&self, scan_id: i64, hash: &str) -> StoreResult<Option<UrlRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT url_id, scan_id, url_hash, url_text, hostname, root_stem, is_crawled,
             is_blacklisted, next_url_id, status_code, content_type, page_title,
             created_at, crawled_at
             FROM urls WHERE scan_id = ?1 AND url_hash = ?2",
        )?;

        let record = stmt
            .query_row(params![scan_id, hash], Self::url_from_row)
            .optional()?;

        Ok(record)
    }
}

impl LinkGraphStore for SqliteStore {
    // ===== Scan Management =====

    fn create_scan(
        &mut self,
        name: &str,
        description: Option<&str>,
        seed_url: &str,
        host_pattern: &str,
        path_pattern: &str,
        config_hash: &str,
    ) -> StoreResult<ScanRecord> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO scans (name, description, seed_url, host_pattern, path_pattern,
             config_hash, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                name,
                description,
                seed_url,
                host_pattern,
                path_pattern,
                config_hash,
                now
            ],
        )?;

        self.get_scan(name)?
            .ok_or_else(|| StoreError::ScanNotFound(name.to_string()))
    }

    fn get_scan(&self, name: &str) -> StoreResult<Option<ScanRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT scan_id, name, description, seed_url, host_pattern, path_pattern,
             config_hash, started_at, ended_at
             FROM scans WHERE name = ?1",
        )?;

        let scan = stmt
            .query_row(params![name], Self::scan_from_row)
            .optional()?;

        Ok(scan)
    }

    fn end_scan(&mut self, scan_id: i64) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE scans SET ended_at = ?1 WHERE scan_id = ?2",
            params![now, scan_id],
        )?;
        Ok(())
    }

    // ===== URL Management =====

    fn get_or_create_url(
        &mut self,
        scan_id: i64,
        url: &Url,
        root_stem: &str,
    ) -> StoreResult<(UrlRecord, bool)> {
        let hash = url_hash(url);
        let hostname = url.host_str().unwrap_or_default();
        let now = Utc::now().to_rfc3339();

        // INSERT OR IGNORE lets the unique (scan_id, url_hash) constraint
        // arbitrate between racing workers; changes() tells us who won.
        self.conn.execute(
            "INSERT OR IGNORE INTO urls (scan_id, url_hash, url_text, hostname, root_stem, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![scan_id, hash, url.as_str(), hostname, root_stem, now],
        )?;
        let created = self.conn.changes() > 0;

        let record = self
            .select_url(scan_id, &hash)?
            .ok_or(StoreError::UrlNotFound(-1))?;

        Ok((record, created))
    }

    fn get_url(&self, url_id: i64) -> StoreResult<UrlRecord> {
        let mut stmt = self.conn.prepare(
            "SELECT url_id, scan_id, url_hash, url_text, hostname, root_stem, is_crawled,
             is_blacklisted, next_url_id, status_code, content_type, page_title,
             created_at, crawled_at
             FROM urls WHERE url_id = ?1",
        )?;

        stmt.query_row(params![url_id], Self::url_from_row)
            .optional()?
            .ok_or(StoreError::UrlNotFound(url_id))
    }

    fn record_crawl(
        &mut self,
        url_id: i64,
        status_code: Option<u16>,
        content_type: Option<&str>,
        page_title: Option<&str>,
        blacklisted: bool,
    ) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();

        // The is_crawled guard keeps the flag monotonic across redeliveries.
        self.conn.execute(
            "UPDATE urls
             SET is_crawled = 1, is_blacklisted = ?1, status_code = ?2,
                 content_type = ?3, page_title = ?4, crawled_at = ?5
             WHERE url_id = ?6 AND is_crawled = 0",
            params![
                blacklisted as i64,
                status_code,
                content_type,
                page_title,
                now,
                url_id
            ],
        )?;
        Ok(())
    }

    fn record_redirect(
        &mut self,
        url_id: i64,
        next_url_id: i64,
        status_code: u16,
    ) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE urls
             SET is_crawled = 1, next_url_id = ?1, status_code = ?2, crawled_at = ?3
             WHERE url_id = ?4 AND is_crawled = 0",
            params![next_url_id, status_code, now, url_id],
        )?;
        Ok(())
    }

    // ===== Link Management =====

    fn record_backlink(&mut self, url_id: i64, source_url_id: i64) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO backlinks (url_id, source_url_id, first_seen_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(url_id, source_url_id)
             DO UPDATE SET ref_count = ref_count + 1",
            params![url_id, source_url_id, now],
        )?;
        Ok(())
    }

    fn record_page_links(&mut self, url_id: i64, links: &[String]) -> StoreResult<()> {
        // Immediate: the existence check and the inserts must see one
        // consistent view even with other worker processes writing.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing: i64 = tx.query_row(
            "SELECT COUNT(*) FROM page_links WHERE url_id = ?1",
            params![url_id],
            |row| row.get(0),
        )?;

        // Write-once: a redelivered page message must not duplicate links.
        if existing == 0 {
            let mut stmt =
                tx.prepare("INSERT INTO page_links (url_id, link) VALUES (?1, ?2)")?;
            for link in links {
                stmt.execute(params![url_id, link])?;
            }
            drop(stmt);
        }

        tx.commit()?;
        Ok(())
    }

    // ===== Error Tracking =====

    fn record_error(&mut self, url_id: i64, error_text: &str) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO scan_errors (url_id, error_text, error_at) VALUES (?1, ?2, ?3)",
            params![url_id, error_text, now],
        )?;

        // Errors are terminal: the URL is never re-fetched. COALESCE keeps
        // any real status code already on the row.
        tx.execute(
            "UPDATE urls
             SET is_crawled = 1,
                 crawled_at = COALESCE(crawled_at, ?1),
                 status_code = COALESCE(status_code, ?2)
             WHERE url_id = ?3",
            params![now, TRANSPORT_ERROR_STATUS, url_id],
        )?;

        tx.commit()?;
        Ok(())
    }

    // ===== Redirect Chains =====

    fn redirect_chain_depth(&self, url_id: i64) -> StoreResult<u32> {
        let mut depth = 0;
        let mut current = url_id;

        while depth < MAX_REDIRECT_HOPS {
            let predecessor: Option<i64> = self
                .conn
                .query_row(
                    "SELECT url_id FROM urls WHERE next_url_id = ?1 LIMIT 1",
                    params![current],
                    |row| row.get(0),
                )
                .optional()?;

            match predecessor {
                Some(id) => {
                    depth += 1;
                    current = id;
                }
                None => break,
            }
        }

        Ok(depth)
    }

    fn resolve_final_target(&self, url_id: i64) -> StoreResult<UrlRecord> {
        let mut record = self.get_url(url_id)?;

        for _ in 0..MAX_REDIRECT_HOPS {
            match record.next_url_id {
                Some(next) => record = self.get_url(next)?,
                None => break,
            }
        }

        Ok(record)
    }

    // ===== Statistics & Reporting =====

    fn count_urls(&self, scan_id: i64) -> StoreResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM urls WHERE scan_id = ?1",
            params![scan_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_crawled(&self, scan_id: i64) -> StoreResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM urls WHERE scan_id = ?1 AND is_crawled = 1",
            params![scan_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_backlinks(&self, scan_id: i64) -> StoreResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM backlinks b
             JOIN urls t ON t.url_id = b.url_id
             WHERE t.scan_id = ?1",
            params![scan_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn backlink_rows(&self, scan_id: i64) -> StoreResult<Vec<BacklinkRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT b.url_id, s.url_text
             FROM backlinks b
             JOIN urls t ON t.url_id = b.url_id
             JOIN urls s ON s.url_id = b.source_url_id
             WHERE t.scan_id = ?1
             ORDER BY b.url_id, b.source_url_id",
        )?;

        let rows = stmt
            .query_map(params![scan_id], |row| {
                Ok(BacklinkRow {
                    url_id: row.get(0)?,
                    source_url: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}
