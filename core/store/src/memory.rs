//! In-memory stores for testing and development.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use drift_common::{Error, Operation, RecordId, Result};

use crate::queue::{QueueStore, SyncQueueEntry};
use crate::record::{Record, RecordStore, SyncStatus};

/// In-memory sync queue.
///
/// Useful for testing and development. All data is stored in memory and
/// lost on drop. Entries keep insertion order, so equal enqueue timestamps
/// still drain first-in first-out.
pub struct MemoryQueueStore {
    entries: Arc<RwLock<Vec<SyncQueueEntry>>>,
}

impl MemoryQueueStore {
    /// Create a new empty queue.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Look up a single entry by id.
    pub fn get(&self, entry_id: Uuid) -> Option<SyncQueueEntry> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .find(|e| e.id == entry_id)
            .cloned()
    }
}

impl Default for MemoryQueueStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn enqueue(
        &self,
        record_id: RecordId,
        operation: Operation,
        payload: serde_json::Value,
    ) -> Result<SyncQueueEntry> {
        let entry = SyncQueueEntry::new(record_id, operation, payload);
        self.entries.write().unwrap().push(entry.clone());
        Ok(entry)
    }

    async fn list_due(&self, max_retries: u32) -> Result<Vec<SyncQueueEntry>> {
        let mut due: Vec<SyncQueueEntry> = self
            .entries
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.retry_count < max_retries)
            .cloned()
            .collect();
        // Stable sort: insertion order breaks enqueued_at ties.
        due.sort_by_key(|e| e.enqueued_at);
        Ok(due)
    }

    async fn remove(&self, record_id: &RecordId) -> Result<usize> {
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|e| &e.record_id != record_id);
        Ok(before - entries.len())
    }

    async fn record_attempt_failure(&self, entry_id: Uuid, error: &str) -> Result<u32> {
        let mut entries = self.entries.write().unwrap();
        let entry = entries
            .iter_mut()
            .find(|e| e.id == entry_id)
            .ok_or_else(|| Error::NotFound(format!("No queue entry {}", entry_id)))?;
        entry.retry_count += 1;
        entry.last_error = Some(error.to_string());
        Ok(entry.retry_count)
    }

    async fn dead_letters(&self, max_retries: u32) -> Result<Vec<SyncQueueEntry>> {
        Ok(self
            .entries
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.retry_count >= max_retries)
            .cloned()
            .collect())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.read().unwrap().len())
    }
}

/// In-memory record store.
pub struct MemoryRecordStore {
    records: Arc<RwLock<HashMap<RecordId, Record>>>,
}

impl MemoryRecordStore {
    /// Create a new empty record store.
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert or replace a record.
    pub fn insert(&self, record: Record) {
        self.records
            .write()
            .unwrap()
            .insert(record.id.clone(), record);
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn records_needing_sync(&self) -> Result<Vec<Record>> {
        Ok(self
            .records
            .read()
            .unwrap()
            .values()
            .filter(|r| r.sync_status.needs_sync())
            .cloned()
            .collect())
    }

    async fn get(&self, id: &RecordId) -> Result<Option<Record>> {
        Ok(self.records.read().unwrap().get(id).cloned())
    }

    async fn update_sync_metadata(
        &self,
        id: &RecordId,
        status: SyncStatus,
        server_id: Option<String>,
        last_synced_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut records = self.records.write().unwrap();
        let record = records
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("No record {}", id)))?;
        record.sync_status = status;
        if record.server_id.is_none() {
            record.server_id = server_id;
        }
        if last_synced_at.is_some() {
            record.last_synced_at = last_synced_at;
        }
        Ok(())
    }

    async fn last_synced_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .records
            .read()
            .unwrap()
            .values()
            .filter_map(|r| r.last_synced_at)
            .max())
    }
}
