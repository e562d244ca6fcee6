//! Storage traits and error types
//!
//! This module defines the trait interface for link graph backends and
//! associated error types.

use crate::storage::{ScanRecord, UrlRecord};
use thiserror::Error;
use url::Url;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Scan not found: {0}")]
    ScanNotFound(String),

    #[error("URL not found: id {0}")]
    UrlNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// One backlink edge, joined with the source URL's text for reporting
#[derive(Debug, Clone)]
pub struct BacklinkRow {
    /// The target URL of the edge
    pub url_id: i64,
    /// The URL of the page the link was found on
    pub source_url: String,
}

/// Trait for link graph backend implementations
///
/// This trait defines all database operations needed by the crawler. Workers
/// share one backend behind a mutex; every operation here is safe to replay
/// after a queue redelivery.
pub trait LinkGraphStore {
    // ===== Scan Management =====

    /// Creates a new scan record
    ///
    /// # Arguments
    ///
    /// * `name` - Unique scan name (also used in queue table names)
    /// * `description` - Free-text description
    /// * `seed_url` - The URL the crawl starts from
    /// * `host_pattern` - Scope host regex, stored on the scan
    /// * `path_pattern` - Scope path regex, stored on the scan
    /// * `config_hash` - Hash of the configuration file
    fn create_scan(
        &mut self,
        name: &str,
        description: Option<&str>,
        seed_url: &str,
        host_pattern: &str,
        path_pattern: &str,
        config_hash: &str,
    ) -> StoreResult<ScanRecord>;

    /// Gets a scan by name
    fn get_scan(&self, name: &str) -> StoreResult<Option<ScanRecord>>;

    /// Marks a scan as ended with a finish timestamp
    fn end_scan(&mut self, scan_id: i64) -> StoreResult<()>;

    // ===== URL Management =====

    /// Inserts a URL if its hash is new to the scan, otherwise returns the
    /// existing record
    ///
    /// # Returns
    ///
    /// The record plus a flag that is true when the row was created by this
    /// call. Two workers racing on the same URL converge on one row.
    fn get_or_create_url(
        &mut self,
        scan_id: i64,
        url: &Url,
        root_stem: &str,
    ) -> StoreResult<(UrlRecord, bool)>;

    /// Gets a URL record by ID
    fn get_url(&self, url_id: i64) -> StoreResult<UrlRecord>;

    /// Records the outcome of fetching a URL
    ///
    /// The crawled flag is monotonic: once a URL is marked crawled, replays
    /// of the same message leave the row untouched.
    fn record_crawl(
        &mut self,
        url_id: i64,
        status_code: Option<u16>,
        content_type: Option<&str>,
        page_title: Option<&str>,
        blacklisted: bool,
    ) -> StoreResult<()>;

    /// Records that a URL answered with a redirect to another URL
    ///
    /// Marks the URL crawled and points `next_url_id` at the target.
    fn record_redirect(&mut self, url_id: i64, next_url_id: i64, status_code: u16)
        -> StoreResult<()>;

    // ===== Link Management =====

    /// Records one sighting of a link from `source_url_id` to `url_id`
    ///
    /// The first sighting creates the edge; later sightings increment its
    /// reference count.
    fn record_backlink(&mut self, url_id: i64, source_url_id: i64) -> StoreResult<()>;

    /// Stores the raw outgoing links of a fetched page
    ///
    /// Write-once: if the page already has links recorded (a redelivered
    /// message), the call is a no-op.
    fn record_page_links(&mut self, url_id: i64, links: &[String]) -> StoreResult<()>;

    // ===== Error Tracking =====

    /// Appends a crawl error for a URL and marks the URL terminally crawled
    ///
    /// If the URL has no status code yet, the synthetic transport error
    /// status is recorded.
    fn record_error(&mut self, url_id: i64, error_text: &str) -> StoreResult<()>;

    // ===== Redirect Chains =====

    /// Counts redirect hops leading into a URL
    ///
    /// Walks `next_url_id` references backwards, stopping at 10 hops so a
    /// redirect cycle cannot loop the walk.
    fn redirect_chain_depth(&self, url_id: i64) -> StoreResult<u32>;

    /// Follows redirects forward from a URL to the final target
    ///
    /// The walk is bounded at 10 hops; if the chain is longer (or cyclic),
    /// the record at the bound is returned.
    fn resolve_final_target(&self, url_id: i64) -> StoreResult<UrlRecord>;

    // ===== Statistics & Reporting =====

    /// Counts URLs known to a scan
    fn count_urls(&self, scan_id: i64) -> StoreResult<u64>;

    /// Counts URLs a scan has crawled
    fn count_crawled(&self, scan_id: i64) -> StoreResult<u64>;

    /// Counts backlink edges in a scan
    fn count_backlinks(&self, scan_id: i64) -> StoreResult<u64>;

    /// Returns every backlink edge of a scan for report generation
    fn backlink_rows(&self, scan_id: i64) -> StoreResult<Vec<BacklinkRow>>;
}
