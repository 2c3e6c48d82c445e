//! Domain record shape and the record store contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use drift_common::{RecordId, Result};

/// Sync state of a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Local changes not yet delivered.
    Pending,
    /// In sync with the remote authority.
    Synced,
    /// Last delivery attempt failed; will be retried next cycle.
    Error,
    /// Retry budget exhausted. Terminal; requires manual intervention.
    Failed,
}

impl SyncStatus {
    /// Whether the next sync cycle will pick this record up.
    pub fn needs_sync(&self) -> bool {
        matches!(self, SyncStatus::Pending | SyncStatus::Error)
    }
}

/// A domain record with its sync metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    /// Record content. The engine never rewrites this; content is the
    /// record store's concern.
    pub payload: serde_json::Value,
    /// Local modification time, compared against the remote's copy during
    /// conflict resolution.
    pub updated_at: DateTime<Utc>,
    pub sync_status: SyncStatus,
    /// Remote-assigned identifier, set once on first successful sync.
    pub server_id: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl Record {
    /// Create a record that has never been synced.
    pub fn new(id: RecordId, payload: serde_json::Value, updated_at: DateTime<Utc>) -> Self {
        Self {
            id,
            payload,
            updated_at,
            sync_status: SyncStatus::Pending,
            server_id: None,
            last_synced_at: None,
        }
    }
}

/// Record store surface consumed by the sync engine.
///
/// The engine only reads pending records and writes back post-sync status;
/// record content lives entirely on the other side of this trait.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Records whose status is Pending or Error. Used by callers enqueueing
    /// work, not by the dispatcher directly.
    async fn records_needing_sync(&self) -> Result<Vec<Record>>;

    /// Fetch a single record.
    async fn get(&self, id: &RecordId) -> Result<Option<Record>>;

    /// Write back sync metadata after a delivery attempt.
    ///
    /// `server_id` is stored only the first time it is supplied; later
    /// values are ignored. `last_synced_at` is updated when present.
    async fn update_sync_metadata(
        &self,
        id: &RecordId,
        status: SyncStatus,
        server_id: Option<String>,
        last_synced_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Latest successful sync time across all records, if any.
    async fn last_synced_at(&self) -> Result<Option<DateTime<Utc>>>;

    /// Count of records the next cycle will pick up (Pending or Error;
    /// Failed records require manual intervention and are excluded).
    async fn pending_count(&self) -> Result<usize> {
        Ok(self
            .records_needing_sync()
            .await?
            .len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_sync() {
        assert!(SyncStatus::Pending.needs_sync());
        assert!(SyncStatus::Error.needs_sync());
        assert!(!SyncStatus::Synced.needs_sync());
        assert!(!SyncStatus::Failed.needs_sync());
    }

    #[test]
    fn test_new_record_is_pending() {
        let record = Record::new(
            RecordId::new("rec_1").unwrap(),
            serde_json::json!({"title": "note"}),
            Utc::now(),
        );
        assert_eq!(record.sync_status, SyncStatus::Pending);
        assert!(record.server_id.is_none());
        assert!(record.last_synced_at.is_none());
    }
}
