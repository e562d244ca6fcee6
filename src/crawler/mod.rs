//! Crawler module for page fetching and link processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with redirect capture
//! - HTML parsing and raw link extraction
//! - Queue consumers for the page and link roles
//! - Per-process worker pool orchestration

mod fetcher;
mod orchestrator;
mod parser;
mod worker;

pub use fetcher::{build_http_client, fetch_url, FetchOutcome};
pub use orchestrator::Orchestrator;
pub use parser::{parse_html, ParsedPage};
pub use worker::{consume_loop, process_link_message, process_page_message, WorkerContext};

use crate::queue::QueueKind;

/// Which queue a worker process consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Role {
    /// Fetch URLs from the page queue
    Page,
    /// Fold extracted links from the link queue into the graph
    Link,
}

impl Role {
    /// Maps the role to the queue it consumes.
    pub fn queue_kind(&self) -> QueueKind {
        match self {
            Self::Page => QueueKind::Page,
            Self::Link => QueueKind::Link,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Page => write!(f, "page"),
            Self::Link => write!(f, "link"),
        }
    }
}
