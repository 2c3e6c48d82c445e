//! Retry accounting and dead-letter escalation.

use tracing::{debug, warn};

use drift_common::Result;
use drift_store::{QueueStore, RecordStore, SyncQueueEntry, SyncStatus};

/// Outcome of handling one failed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// Entry remains below the retry bound; it stays due for the next cycle.
    WillRetry { retry_count: u32 },
    /// Retry budget exhausted. The record is marked Failed and the entry is
    /// kept in the queue store as a dead letter.
    DeadLettered { retry_count: u32 },
}

/// Tracks per-item attempt counts and escalates to a terminal Failed state
/// once the bound is reached.
///
/// This is the only place retry counts are mutated; the dispatcher calls it
/// exactly once per failed item per cycle. Remote-reported errors are not
/// classified further — a validation error consumes a retry attempt the
/// same way a timeout does.
pub struct RetryController {
    max_retries: u32,
}

impl RetryController {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Record a failed delivery attempt for `entry` and update the record's
    /// sync status accordingly.
    pub async fn handle_failure<Q, R>(
        &self,
        queue: &Q,
        records: &R,
        entry: &SyncQueueEntry,
        error: &str,
    ) -> Result<Escalation>
    where
        Q: QueueStore + ?Sized,
        R: RecordStore + ?Sized,
    {
        let retry_count = queue.record_attempt_failure(entry.id, error).await?;

        if retry_count >= self.max_retries {
            warn!(
                "Record {} exhausted {} sync attempts, dead-lettering: {}",
                entry.record_id, retry_count, error
            );
            records
                .update_sync_metadata(&entry.record_id, SyncStatus::Failed, None, None)
                .await?;
            Ok(Escalation::DeadLettered { retry_count })
        } else {
            debug!(
                "Sync attempt {} failed for record {}: {}",
                retry_count, entry.record_id, error
            );
            records
                .update_sync_metadata(&entry.record_id, SyncStatus::Error, None, None)
                .await?;
            Ok(Escalation::WillRetry { retry_count })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use drift_common::{Operation, RecordId};
    use drift_store::{MemoryQueueStore, MemoryRecordStore, Record};
    use serde_json::json;

    fn rid(s: &str) -> RecordId {
        RecordId::new(s).unwrap()
    }

    async fn setup() -> (MemoryQueueStore, MemoryRecordStore, SyncQueueEntry) {
        let queue = MemoryQueueStore::new();
        let records = MemoryRecordStore::new();
        records.insert(Record::new(rid("a"), json!({}), Utc::now()));
        let entry = queue
            .enqueue(rid("a"), Operation::Update, json!({}))
            .await
            .unwrap();
        (queue, records, entry)
    }

    #[tokio::test]
    async fn test_below_bound_marks_error_and_stays_due() {
        let (queue, records, entry) = setup().await;
        let controller = RetryController::new(3);

        let escalation = controller
            .handle_failure(&queue, &records, &entry, "timeout")
            .await
            .unwrap();

        assert_eq!(escalation, Escalation::WillRetry { retry_count: 1 });
        let record = records.get(&rid("a")).await.unwrap().unwrap();
        assert_eq!(record.sync_status, SyncStatus::Error);
        assert_eq!(queue.list_due(3).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_bound_reached_dead_letters() {
        let (queue, records, entry) = setup().await;
        let controller = RetryController::new(3);

        for _ in 0..2 {
            controller
                .handle_failure(&queue, &records, &entry, "timeout")
                .await
                .unwrap();
        }
        let escalation = controller
            .handle_failure(&queue, &records, &entry, "timeout")
            .await
            .unwrap();

        assert_eq!(escalation, Escalation::DeadLettered { retry_count: 3 });
        let record = records.get(&rid("a")).await.unwrap().unwrap();
        assert_eq!(record.sync_status, SyncStatus::Failed);
        // No longer due, but retained for inspection.
        assert!(queue.list_due(3).await.unwrap().is_empty());
        assert_eq!(queue.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_one_attempt_short_of_bound_remains_due() {
        let (queue, records, entry) = setup().await;
        let controller = RetryController::new(3);

        for _ in 0..2 {
            controller
                .handle_failure(&queue, &records, &entry, "timeout")
                .await
                .unwrap();
        }

        let record = records.get(&rid("a")).await.unwrap().unwrap();
        assert_eq!(record.sync_status, SyncStatus::Error);
        let due = queue.list_due(3).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].retry_count, 2);
    }
}
