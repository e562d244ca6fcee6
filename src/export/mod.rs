//! Backlink report export
//!
//! Produces the tab-delimited backlink report for a scan: one row per
//! backlink edge, with the target resolved through any recorded redirect
//! chain so the report shows where a link actually lands.

use crate::storage::LinkGraphStore;
use crate::Result;
use csv::{QuoteStyle, WriterBuilder};
use std::io::Write;
use std::path::Path;

const HEADER: [&str; 5] = ["Target", "Root Stem", "Content-Type", "Status Code", "Source"];

/// Writes the backlink report for a scan
///
/// Every field is quoted and columns are tab-separated. Targets that
/// answered with a redirect are reported as their final destination
/// (following at most the stored chain bound).
///
/// # Arguments
///
/// * `store` - The link graph backend
/// * `scan_id` - The scan to report on
/// * `writer` - Destination for the CSV output
///
/// # Returns
///
/// The number of rows written, excluding the header.
pub fn export_report<S: LinkGraphStore, W: Write>(
    store: &S,
    scan_id: i64,
    writer: W,
) -> Result<u64> {
    let mut csv_writer = WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Always)
        .from_writer(writer);

    csv_writer.write_record(HEADER)?;

    let mut rows = 0;
    for edge in store.backlink_rows(scan_id)? {
        let target = store.resolve_final_target(edge.url_id)?;

        let status = target
            .status_code
            .map(|code| code.to_string())
            .unwrap_or_default();

        csv_writer.write_record([
            target.url_text.as_str(),
            target.root_stem.as_str(),
            target.content_type.as_deref().unwrap_or_default(),
            status.as_str(),
            edge.source_url.as_str(),
        ])?;
        rows += 1;
    }

    csv_writer.flush().map_err(crate::LinkscanError::Io)?;
    Ok(rows)
}

/// Writes the backlink report to a file
pub fn export_report_to_file<S: LinkGraphStore>(
    store: &S,
    scan_id: i64,
    path: &Path,
) -> Result<u64> {
    let file = std::fs::File::create(path)?;
    export_report(store, scan_id, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{LinkGraphStore, SqliteStore};
    use url::Url;

    fn setup() -> (SqliteStore, i64) {
        let mut store = SqliteStore::new_in_memory().unwrap();
        let scan = store
            .create_scan(
                "export_test",
                None,
                "https://example.com/",
                r"^example\.com$",
                "^/",
                "hash",
            )
            .unwrap();
        (store, scan.scan_id)
    }

    fn add(store: &mut SqliteStore, scan_id: i64, url: &str, stem: &str) -> i64 {
        let url = Url::parse(url).unwrap();
        store.get_or_create_url(scan_id, &url, stem).unwrap().0.url_id
    }

    #[test]
    fn test_report_header_and_rows() {
        let (mut store, scan_id) = setup();
        let source = add(&mut store, scan_id, "https://example.com/", "example.com");
        let target = add(&mut store, scan_id, "https://example.com/a", "example.com/a");

        store
            .record_crawl(target, Some(200), Some("text/html"), None, false)
            .unwrap();
        store.record_backlink(target, source).unwrap();

        let mut out = Vec::new();
        let rows = export_report(&store, scan_id, &mut out).unwrap();
        assert_eq!(rows, 1);

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "\"Target\"\t\"Root Stem\"\t\"Content-Type\"\t\"Status Code\"\t\"Source\""
        );
        assert_eq!(
            lines.next().unwrap(),
            "\"https://example.com/a\"\t\"example.com/a\"\t\"text/html\"\t\"200\"\t\"https://example.com/\""
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_redirected_target_reported_as_destination() {
        let (mut store, scan_id) = setup();
        let source = add(&mut store, scan_id, "https://example.com/", "example.com");
        let old = add(&mut store, scan_id, "https://example.com/old", "example.com/old");
        let new = add(&mut store, scan_id, "https://example.com/new", "example.com/new");

        store.record_redirect(old, new, 301).unwrap();
        store
            .record_crawl(new, Some(200), Some("text/html"), None, false)
            .unwrap();
        store.record_backlink(old, source).unwrap();

        let mut out = Vec::new();
        export_report(&store, scan_id, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"https://example.com/new\""));
        assert!(!text.contains("\"https://example.com/old\"\t"));
    }

    #[test]
    fn test_uncrawled_target_has_empty_fields() {
        let (mut store, scan_id) = setup();
        let source = add(&mut store, scan_id, "https://example.com/", "example.com");
        let target = add(&mut store, scan_id, "https://example.com/later", "example.com/later");

        store.record_backlink(target, source).unwrap();

        let mut out = Vec::new();
        export_report(&store, scan_id, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"https://example.com/later\"\t\"example.com/later\"\t\"\"\t\"\"\t"));
    }

    #[test]
    fn test_empty_scan_writes_header_only() {
        let (store, scan_id) = setup();

        let mut out = Vec::new();
        let rows = export_report(&store, scan_id, &mut out).unwrap();
        assert_eq!(rows, 0);

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
