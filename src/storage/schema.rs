//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the link graph database.

/// SQL schema for the link graph database
pub const SCHEMA_SQL: &str = r#"
-- Track scans
CREATE TABLE IF NOT EXISTS scans (
    scan_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    description TEXT,
    seed_url TEXT NOT NULL,
    host_pattern TEXT NOT NULL,
    path_pattern TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    started_at TEXT NOT NULL,
    ended_at TEXT
);

-- One row per unique URL per scan. Identity is the SHA-256 of the canonical
-- URL text, enforced by the (scan_id, url_hash) constraint.
CREATE TABLE IF NOT EXISTS urls (
    url_id INTEGER PRIMARY KEY AUTOINCREMENT,
    scan_id INTEGER NOT NULL REFERENCES scans(scan_id),
    url_hash TEXT NOT NULL,
    url_text TEXT NOT NULL,
    hostname TEXT NOT NULL,
    root_stem TEXT NOT NULL,
    is_crawled INTEGER NOT NULL DEFAULT 0,
    is_blacklisted INTEGER NOT NULL DEFAULT 0,
    next_url_id INTEGER REFERENCES urls(url_id),
    status_code INTEGER,
    content_type TEXT,
    page_title TEXT,
    created_at TEXT NOT NULL,
    crawled_at TEXT,
    UNIQUE(scan_id, url_hash)
);

CREATE INDEX IF NOT EXISTS idx_urls_scan_crawled ON urls(scan_id, is_crawled);
CREATE INDEX IF NOT EXISTS idx_urls_next ON urls(next_url_id);
CREATE INDEX IF NOT EXISTS idx_urls_hostname ON urls(hostname);

-- Incoming-link edges, one row per (target, source) pair with a reference
-- count for repeat sightings.
CREATE TABLE IF NOT EXISTS backlinks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url_id INTEGER NOT NULL REFERENCES urls(url_id),
    source_url_id INTEGER NOT NULL REFERENCES urls(url_id),
    ref_count INTEGER NOT NULL DEFAULT 1,
    first_seen_at TEXT NOT NULL,
    UNIQUE(url_id, source_url_id)
);

CREATE INDEX IF NOT EXISTS idx_backlinks_url ON backlinks(url_id);
CREATE INDEX IF NOT EXISTS idx_backlinks_source ON backlinks(source_url_id);

-- Raw outgoing link text per fetched page, written once per URL
CREATE TABLE IF NOT EXISTS page_links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url_id INTEGER NOT NULL REFERENCES urls(url_id),
    link TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_page_links_url ON page_links(url_id);

-- Append-only crawl error log
CREATE TABLE IF NOT EXISTS scan_errors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url_id INTEGER NOT NULL REFERENCES urls(url_id),
    error_text TEXT NOT NULL,
    error_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_scan_errors_url ON scan_errors(url_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_initializes() {
        let conn = Connection::open_in_memory().unwrap();
        let result = initialize_schema(&conn);
        assert!(result.is_ok());
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        // Initialize twice
        initialize_schema(&conn).unwrap();
        let result = initialize_schema(&conn);

        // Should succeed the second time too
        assert!(result.is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        let tables = vec!["scans", "urls", "backlinks", "page_links", "scan_errors"];

        for table in tables {
            let count: Result<i64, _> = conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='{}'",
                    table
                ),
                [],
                |row| row.get(0),
            );
            assert!(count.is_ok());
            assert_eq!(count.unwrap(), 1, "Table {} should exist", table);
        }
    }

    #[test]
    fn test_url_hash_unique_per_scan() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        conn.execute(
            "INSERT INTO scans (name, seed_url, host_pattern, path_pattern, config_hash, started_at)
             VALUES ('s', 'https://x/', '.*', '.*', 'h', 'now')",
            [],
        )
        .unwrap();

        let insert = "INSERT INTO urls (scan_id, url_hash, url_text, hostname, root_stem, created_at)
                      VALUES (1, 'abc', 'https://x/', 'x', 'x', 'now')";
        conn.execute(insert, []).unwrap();
        assert!(conn.execute(insert, []).is_err());
    }
}
