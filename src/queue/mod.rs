//! Durable work queues
//!
//! Workers coordinate through two durable FIFO queues per scan: a page queue
//! of URLs to fetch and a link queue of extracted-link payloads. Delivery is
//! at-least-once; every consumer keeps at most one leased message outstanding
//! and acknowledges it only after the resulting writes are committed.

mod sqlite;

pub use sqlite::SqliteQueue;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Invalid queue name: {0}")]
    InvalidName(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// The two queues a scan runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    /// URLs waiting to be fetched
    Page,
    /// Extracted-link payloads waiting to be folded into the graph
    Link,
}

impl QueueKind {
    fn suffix(&self) -> &'static str {
        match self {
            Self::Page => "page_queue",
            Self::Link => "link_queue",
        }
    }
}

/// Builds the durable queue name for a scan.
///
/// Queue names are namespaced by scan so independent scans sharing a queue
/// database never see each other's messages.
pub fn queue_name(scan: &str, kind: QueueKind) -> String {
    format!("{}_{}", scan, kind.suffix())
}

/// A message currently leased by a consumer.
///
/// The message stays in the queue until acknowledged; if the consumer dies
/// the lease expires and the message is redelivered.
#[derive(Debug, Clone)]
pub struct LeasedMessage {
    pub id: i64,
    pub payload: Vec<u8>,
}

/// Payload carried on the link queue: one fetched page and the raw links
/// found on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkPayload {
    pub url: String,
    pub links: Vec<String>,
}

/// Trait for durable queue implementations
pub trait WorkQueue {
    /// Appends a message to the tail of the queue
    fn push(&self, payload: &[u8]) -> QueueResult<()>;

    /// Leases the oldest unleased message, if any
    fn lease(&self) -> QueueResult<Option<LeasedMessage>>;

    /// Acknowledges a leased message, removing it permanently
    fn ack(&self, message: &LeasedMessage) -> QueueResult<()>;

    /// Returns expired leases to the queue; returns how many were recovered
    fn requeue_expired(&self) -> QueueResult<u64>;

    /// Counts messages available for lease
    fn len(&self) -> QueueResult<u64>;

    /// Counts all messages in the queue, currently-leased ones included
    fn total(&self) -> QueueResult<u64>;

    /// True when no messages are available for lease
    fn is_empty(&self) -> QueueResult<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_name() {
        assert_eq!(queue_name("docs_site", QueueKind::Page), "docs_site_page_queue");
        assert_eq!(queue_name("docs_site", QueueKind::Link), "docs_site_link_queue");
    }

    #[test]
    fn test_link_payload_roundtrip() {
        let payload = LinkPayload {
            url: "https://example.com/a".to_string(),
            links: vec!["/b".to_string(), "https://other/".to_string()],
        };

        let bytes = serde_json::to_vec(&payload).unwrap();
        let decoded: LinkPayload = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded.url, payload.url);
        assert_eq!(decoded.links, payload.links);
    }
}
