use serde::Deserialize;

/// Main configuration structure for linkscan
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub scan: ScanConfig,
    #[serde(default)]
    pub http: HttpConfig,
    pub queue: QueueConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub blacklist: Vec<BlacklistEntry>,
    #[serde(default = "default_invalid_tokens", rename = "invalid-tokens")]
    pub invalid_tokens: Vec<String>,
}

/// Scan definition: seed and scope for one crawl job
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// Free-text description stored on the scan record
    #[serde(default)]
    pub description: Option<String>,

    /// The URL the crawl starts from
    #[serde(rename = "seed-url")]
    pub seed_url: String,

    /// Regex a URL's hostname must satisfy to be in scope
    #[serde(rename = "host-pattern")]
    pub host_pattern: String,

    /// Regex a URL's path must satisfy to be in scope
    #[serde(rename = "path-pattern")]
    pub path_pattern: String,
}

/// HTTP transport configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs", rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent", rename = "user-agent")]
    pub user_agent: String,

    /// Content types whose bodies are parsed for links (exact match)
    #[serde(
        default = "default_allowed_content_types",
        rename = "allowed-content-types"
    )]
    pub allowed_content_types: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            allowed_content_types: default_allowed_content_types(),
        }
    }
}

/// Work queue configuration
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Path to the SQLite file holding the durable queues
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Seconds before an unacknowledged lease becomes redeliverable
    #[serde(default = "default_lease_timeout_secs", rename = "lease-timeout-secs")]
    pub lease_timeout_secs: u64,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the link-graph SQLite database
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// One host's blacklist entry.
///
/// An entry with no filters set blocks the entire host.
#[derive(Debug, Clone, Deserialize)]
pub struct BlacklistEntry {
    /// Exact hostname the rules apply to
    pub host: String,

    /// Explicitly block the whole host regardless of other filters
    #[serde(default, rename = "block-all")]
    pub block_all: bool,

    /// Block when the URL scheme equals this value
    #[serde(default)]
    pub scheme: Option<String>,

    /// Block when the URL path starts with any of these prefixes
    #[serde(default)]
    pub paths: Vec<String>,

    /// Block when any of these tokens appears in the query string
    #[serde(default, rename = "query-tokens")]
    pub query_tokens: Vec<String>,

    /// Legacy path-vs-netloc comparison, kept for compatibility
    #[serde(default)]
    pub netloc: Option<String>,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_lease_timeout_secs() -> u64 {
    300
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/69.0.3497.92 Safari/537.36"
        .to_string()
}

fn default_allowed_content_types() -> Vec<String> {
    vec![
        "text/html".to_string(),
        "text/html; charset=UTF-8".to_string(),
        "text/html; charset=utf-8".to_string(),
    ]
}

fn default_invalid_tokens() -> Vec<String> {
    vec!["http[s]?://mailto:".to_string()]
}
