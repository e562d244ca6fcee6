//! SQLite-backed durable queue
//!
//! Each queue is one table in a shared queue database. A lease marks a row
//! with the lease timestamp; acknowledgement deletes the row. Rows whose
//! lease has outlived the configured timeout are returned to the queue by
//! `requeue_expired`, which is what makes delivery at-least-once.

use crate::queue::{LeasedMessage, QueueError, QueueResult, WorkQueue};
use chrono::{Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::Mutex;

/// A durable FIFO queue stored in a SQLite table
pub struct SqliteQueue {
    conn: Mutex<Connection>,
    table: String,
    lease_timeout_secs: i64,
}

impl SqliteQueue {
    /// Opens (creating if needed) the named queue in the queue database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the shared queue database file
    /// * `name` - Queue name, restricted to alphanumerics and underscores
    ///   because it becomes the table name
    /// * `lease_timeout_secs` - Seconds before an unacknowledged lease is
    ///   considered abandoned
    pub fn open(path: &Path, name: &str, lease_timeout_secs: u64) -> QueueResult<Self> {
        validate_queue_name(name)?;

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        Self::with_connection(conn, name, lease_timeout_secs)
    }

    /// Builds a queue over an in-memory database, used by tests
    pub fn open_in_memory(name: &str, lease_timeout_secs: u64) -> QueueResult<Self> {
        validate_queue_name(name)?;
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, name, lease_timeout_secs)
    }

    fn with_connection(
        conn: Connection,
        name: &str,
        lease_timeout_secs: u64,
    ) -> QueueResult<Self> {
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    payload BLOB NOT NULL,
                    enqueued_at TEXT NOT NULL,
                    leased_at TEXT
                )",
                name
            ),
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            table: name.to_string(),
            lease_timeout_secs: lease_timeout_secs as i64,
        })
    }
}

impl WorkQueue for SqliteQueue {
    fn push(&self, payload: &[u8]) -> QueueResult<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (payload, enqueued_at) VALUES (?1, ?2)",
                self.table
            ),
            params![payload, now],
        )?;
        Ok(())
    }

    fn lease(&self) -> QueueResult<Option<LeasedMessage>> {
        let now = Utc::now().to_rfc3339();
        let mut conn = self.conn.lock().unwrap();

        // Select-then-mark inside one immediate transaction: the write lock
        // is taken before the candidate row is read, so concurrent consumer
        // processes serialize on it (via busy_timeout) instead of failing on
        // a stale WAL snapshot, and two consumers can never lease the same
        // row.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let candidate: Option<(i64, Vec<u8>)> = tx
            .query_row(
                &format!(
                    "SELECT id, payload FROM {} WHERE leased_at IS NULL ORDER BY id LIMIT 1",
                    self.table
                ),
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let message = match candidate {
            Some((id, payload)) => {
                tx.execute(
                    &format!("UPDATE {} SET leased_at = ?1 WHERE id = ?2", self.table),
                    params![now, id],
                )?;
                Some(LeasedMessage { id, payload })
            }
            None => None,
        };

        tx.commit()?;
        Ok(message)
    }

    fn ack(&self, message: &LeasedMessage) -> QueueResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", self.table),
            params![message.id],
        )?;
        Ok(())
    }

    fn requeue_expired(&self) -> QueueResult<u64> {
        let cutoff = (Utc::now() - Duration::seconds(self.lease_timeout_secs)).to_rfc3339();
        let conn = self.conn.lock().unwrap();

        // RFC 3339 strings in UTC compare correctly as text.
        let recovered = conn.execute(
            &format!(
                "UPDATE {} SET leased_at = NULL WHERE leased_at IS NOT NULL AND leased_at < ?1",
                self.table
            ),
            params![cutoff],
        )?;
        Ok(recovered as u64)
    }

    fn len(&self) -> QueueResult<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE leased_at IS NULL", self.table),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn total(&self) -> QueueResult<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.table),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

/// Queue names are interpolated into SQL, so anything beyond alphanumerics
/// and underscores is rejected outright.
fn validate_queue_name(name: &str) -> QueueResult<()> {
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(QueueError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> SqliteQueue {
        SqliteQueue::open_in_memory("test_page_queue", 300).unwrap()
    }

    #[test]
    fn test_push_and_lease_fifo_order() {
        let q = queue();
        q.push(b"first").unwrap();
        q.push(b"second").unwrap();

        let a = q.lease().unwrap().unwrap();
        let b = q.lease().unwrap().unwrap();
        assert_eq!(a.payload, b"first");
        assert_eq!(b.payload, b"second");
    }

    #[test]
    fn test_lease_empty_queue() {
        let q = queue();
        assert!(q.lease().unwrap().is_none());
    }

    #[test]
    fn test_leased_message_not_redelivered() {
        let q = queue();
        q.push(b"only").unwrap();

        let msg = q.lease().unwrap().unwrap();
        assert!(q.lease().unwrap().is_none());
        assert_eq!(q.len().unwrap(), 0);

        q.ack(&msg).unwrap();
        assert!(q.lease().unwrap().is_none());
    }

    #[test]
    fn test_unacked_message_survives() {
        let q = queue();
        q.push(b"pending").unwrap();
        let _msg = q.lease().unwrap().unwrap();

        // The row is still there until acked.
        let conn = q.conn.lock().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM test_page_queue", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_expired_lease_is_redelivered() {
        // Zero timeout: every lease is immediately expired.
        let q = SqliteQueue::open_in_memory("test_expiry_queue", 0).unwrap();
        q.push(b"retry-me").unwrap();

        let first = q.lease().unwrap().unwrap();
        assert!(q.lease().unwrap().is_none());

        let recovered = q.requeue_expired().unwrap();
        assert_eq!(recovered, 1);

        let second = q.lease().unwrap().unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.payload, b"retry-me");
    }

    #[test]
    fn test_fresh_lease_not_requeued() {
        let q = queue();
        q.push(b"held").unwrap();
        let _msg = q.lease().unwrap().unwrap();

        assert_eq!(q.requeue_expired().unwrap(), 0);
    }

    #[test]
    fn test_len_counts_available_only() {
        let q = queue();
        assert!(q.is_empty().unwrap());

        q.push(b"a").unwrap();
        q.push(b"b").unwrap();
        assert_eq!(q.len().unwrap(), 2);

        let _msg = q.lease().unwrap().unwrap();
        assert_eq!(q.len().unwrap(), 1);
    }

    #[test]
    fn test_total_includes_leased() {
        let q = queue();
        q.push(b"a").unwrap();
        q.push(b"b").unwrap();

        let msg = q.lease().unwrap().unwrap();
        assert_eq!(q.len().unwrap(), 1);
        assert_eq!(q.total().unwrap(), 2);

        q.ack(&msg).unwrap();
        assert_eq!(q.total().unwrap(), 1);
    }

    #[test]
    fn test_concurrent_consumers_never_share_a_lease() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queues.db");

        let producer = SqliteQueue::open(&path, "shared_queue", 300).unwrap();
        for i in 0..50 {
            producer.push(format!("msg-{}", i).as_bytes()).unwrap();
        }

        // Two independent connections draining the same queue, as two worker
        // processes would.
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let consumer = SqliteQueue::open(&path, "shared_queue", 300).unwrap();
                std::thread::spawn(move || {
                    let mut leased = Vec::new();
                    while let Some(message) = consumer.lease().unwrap() {
                        leased.push(message.id);
                        consumer.ack(&message).unwrap();
                    }
                    leased
                })
            })
            .collect();

        let mut ids: Vec<i64> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        ids.sort_unstable();
        ids.dedup();

        // Every message was delivered exactly once across both consumers.
        assert_eq!(ids.len(), 50);
        assert_eq!(producer.len().unwrap(), 0);
    }

    #[test]
    fn test_invalid_queue_name_rejected() {
        assert!(SqliteQueue::open_in_memory("bad-name", 300).is_err());
        assert!(SqliteQueue::open_in_memory("drop table;", 300).is_err());
        assert!(SqliteQueue::open_in_memory("", 300).is_err());
    }
}
