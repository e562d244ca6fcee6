//! URL handling module for linkscan
//!
//! This module provides canonical resolution of raw link text against a parent
//! page URL, the content-hash identity used for deduplication, and the
//! root-stem grouping key.

mod resolve;
mod stem;

pub use resolve::{resolve, Skip};
pub use stem::root_stem;

use sha2::{Digest, Sha256};
use url::Url;

/// Computes the content-hash identity of a canonical URL.
///
/// The hash is the hex-encoded SHA-256 of the canonical URL text, giving a
/// fixed-width key independent of URL length. Two URLs collide on this key
/// only if their canonical text is identical, so `(scan, url_hash)` uniqueness
/// in the store is equivalent to `(scan, url_text)` uniqueness.
pub fn url_hash(url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_hash_is_stable() {
        let a = Url::parse("https://example.com/page").unwrap();
        let b = Url::parse("https://example.com/page").unwrap();
        assert_eq!(url_hash(&a), url_hash(&b));
        assert_eq!(url_hash(&a).len(), 64);
    }

    #[test]
    fn test_url_hash_differs_by_text() {
        let a = Url::parse("https://example.com/page").unwrap();
        let b = Url::parse("https://example.com/page/").unwrap();
        assert_ne!(url_hash(&a), url_hash(&b));
    }
}
