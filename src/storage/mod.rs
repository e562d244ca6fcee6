//! Storage module for the link graph
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Scan lifecycle tracking
//! - Deduplicated URL records with crawl state
//! - Backlink and page-link persistence
//! - Redirect chain tracking
//! - Crawl error recording

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{BacklinkRow, LinkGraphStore, StoreError, StoreResult};

use crate::LinkscanError;

use std::path::Path;

/// Synthetic status code recorded for transport-level failures where no HTTP
/// response was ever received (DNS failure, timeout, TLS handshake error).
pub const TRANSPORT_ERROR_STATUS: u16 = 909;

/// Maximum number of redirect hops a chain may grow to. Chain walks stop at
/// this bound, which also makes them safe against redirect cycles.
pub const MAX_REDIRECT_HOPS: u32 = 10;

/// Initializes or opens a link graph database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStore)` - Successfully initialized store
/// * `Err(LinkscanError)` - Failed to open the database
pub fn open_store(path: &Path) -> Result<SqliteStore, LinkscanError> {
    SqliteStore::new(path)
}

/// Represents a scan in the database
#[derive(Debug, Clone)]
pub struct ScanRecord {
    pub scan_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub seed_url: String,
    pub host_pattern: String,
    pub path_pattern: String,
    pub config_hash: String,
    pub started_at: String,
    pub ended_at: Option<String>,
}

/// Represents one deduplicated URL within a scan
#[derive(Debug, Clone)]
pub struct UrlRecord {
    pub url_id: i64,
    pub scan_id: i64,
    pub url_hash: String,
    pub url_text: String,
    pub hostname: String,
    pub root_stem: String,
    pub is_crawled: bool,
    pub is_blacklisted: bool,
    /// Set when this URL answered with a redirect; points at the target URL.
    pub next_url_id: Option<i64>,
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    pub page_title: Option<String>,
    pub created_at: String,
    pub crawled_at: Option<String>,
}

/// Derived lifecycle state of a URL record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlState {
    /// Known to the graph but not yet fetched
    Discovered,
    /// Excluded by the blacklist policy, never fetched
    Blacklisted,
    /// Fetched; an HTTP response (of any status) was recorded
    Crawled,
    /// Terminal failure with no HTTP response
    Failed,
}

impl UrlRecord {
    /// Derives the lifecycle state from the stored flags.
    pub fn state(&self) -> UrlState {
        if self.is_blacklisted {
            UrlState::Blacklisted
        } else if !self.is_crawled {
            UrlState::Discovered
        } else if self.status_code == Some(TRANSPORT_ERROR_STATUS) {
            UrlState::Failed
        } else {
            UrlState::Crawled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> UrlRecord {
        UrlRecord {
            url_id: 1,
            scan_id: 1,
            url_hash: "deadbeef".to_string(),
            url_text: "https://example.com/".to_string(),
            hostname: "example.com".to_string(),
            root_stem: "example.com".to_string(),
            is_crawled: false,
            is_blacklisted: false,
            next_url_id: None,
            status_code: None,
            content_type: None,
            page_title: None,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            crawled_at: None,
        }
    }

    #[test]
    fn test_state_discovered() {
        assert_eq!(record().state(), UrlState::Discovered);
    }

    #[test]
    fn test_state_blacklisted_wins() {
        let mut r = record();
        r.is_blacklisted = true;
        r.is_crawled = true;
        r.status_code = Some(200);
        assert_eq!(r.state(), UrlState::Blacklisted);
    }

    #[test]
    fn test_state_crawled_includes_http_errors() {
        let mut r = record();
        r.is_crawled = true;
        r.status_code = Some(404);
        assert_eq!(r.state(), UrlState::Crawled);
    }

    #[test]
    fn test_state_failed_on_transport_error() {
        let mut r = record();
        r.is_crawled = true;
        r.status_code = Some(TRANSPORT_ERROR_STATUS);
        assert_eq!(r.state(), UrlState::Failed);
    }
}
