//! Sync queue contract and entry shape.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use drift_common::{Operation, RecordId, Result};

/// A single queued operation awaiting delivery to the remote authority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncQueueEntry {
    /// Entry identifier, assigned at enqueue time, never reused.
    pub id: Uuid,
    /// Record the operation applies to.
    pub record_id: RecordId,
    /// Mutation kind.
    pub operation: Operation,
    /// Full-record snapshot taken when the operation was enqueued, not a
    /// diff. A record reaching success can therefore clear its whole
    /// backlog: the latest snapshot already reflects every earlier edit.
    pub payload: serde_json::Value,
    /// Enqueue time; drain order is ascending on this field.
    pub enqueued_at: DateTime<Utc>,
    /// Failed delivery attempts so far.
    pub retry_count: u32,
    /// Message from the most recent failed attempt.
    pub last_error: Option<String>,
}

impl SyncQueueEntry {
    /// Create a fresh entry with a zero retry count.
    pub fn new(record_id: RecordId, operation: Operation, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            record_id,
            operation,
            payload,
            enqueued_at: Utc::now(),
            retry_count: 0,
            last_error: None,
        }
    }
}

/// Durable ordered log of pending sync operations.
///
/// Entries are mutated in place only through [`record_attempt_failure`]
/// (`retry_count`/`last_error`); they are removed only on confirmed success
/// or conflict-resolution success. Entries past the retry bound stay in the
/// store as dead letters for inspection.
///
/// [`record_attempt_failure`]: QueueStore::record_attempt_failure
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Append a new entry with a zero retry count.
    async fn enqueue(
        &self,
        record_id: RecordId,
        operation: Operation,
        payload: serde_json::Value,
    ) -> Result<SyncQueueEntry>;

    /// All entries still eligible for delivery (`retry_count < max_retries`),
    /// ordered ascending by enqueue time globally across all records. The
    /// global order is what yields the batching order; it also preserves each
    /// record's own create→update→delete sequence.
    async fn list_due(&self, max_retries: u32) -> Result<Vec<SyncQueueEntry>>;

    /// Delete every entry for the given record. Returns the number removed.
    async fn remove(&self, record_id: &RecordId) -> Result<usize>;

    /// Record a failed delivery attempt for `entry_id`, storing the error
    /// message and returning the new retry count so the caller can decide
    /// escalation.
    async fn record_attempt_failure(&self, entry_id: Uuid, error: &str) -> Result<u32>;

    /// Entries at or past the retry bound, retained for manual inspection
    /// or replay.
    async fn dead_letters(&self, max_retries: u32) -> Result<Vec<SyncQueueEntry>>;

    /// Total number of entries, dead letters included.
    async fn len(&self) -> Result<usize>;
}
