//! Scope and blacklist evaluation
//!
//! A scan's scope is a host-pattern/path-pattern regex pair deciding which
//! discovered URLs are eligible for fetching. The blacklist policy is a
//! separate, typed rule set excluding specific hosts, paths, schemes, and
//! query tokens regardless of scope.

mod policy;

pub use policy::{HostRules, ScopePolicy};

use regex::Regex;
use thiserror::Error;
use url::Url;

/// Errors building scope or blacklist rules from configuration
#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("Invalid host pattern '{pattern}': {source}")]
    HostPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("Invalid path pattern '{pattern}': {source}")]
    PathPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("Invalid token pattern '{pattern}': {source}")]
    TokenPattern {
        pattern: String,
        source: regex::Error,
    },
}

/// Result type for scope operations
pub type ScopeResult<T> = std::result::Result<T, ScopeError>;

/// The host/path regex pair defining crawl eligibility for a scan.
///
/// URLs that are off-host or off-path are recorded in the link graph but
/// never enqueued for fetching.
#[derive(Debug, Clone)]
pub struct ScanScope {
    host_pattern: Regex,
    path_pattern: Regex,
}

impl ScanScope {
    /// Compiles a scope from the scan's stored pattern strings.
    pub fn new(host_pattern: &str, path_pattern: &str) -> ScopeResult<Self> {
        let host = Regex::new(host_pattern).map_err(|source| ScopeError::HostPattern {
            pattern: host_pattern.to_string(),
            source,
        })?;
        let path = Regex::new(path_pattern).map_err(|source| ScopeError::PathPattern {
            pattern: path_pattern.to_string(),
            source,
        })?;

        Ok(Self {
            host_pattern: host,
            path_pattern: path,
        })
    }

    /// Returns true if the URL's host satisfies the scan's host pattern.
    pub fn host_in_scope(&self, url: &Url) -> bool {
        url.host_str()
            .map(|host| self.host_pattern.is_match(host))
            .unwrap_or(false)
    }

    /// Returns true if the URL is eligible for fetching.
    ///
    /// Both the host and the path pattern must match.
    pub fn in_scope(&self, url: &Url) -> bool {
        self.host_in_scope(url) && self.path_pattern.is_match(url.path())
    }
}
