//! Batch dispatcher orchestrating drain cycles against the remote authority.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use drift_common::{Operation, RecordId, Result};
use drift_remote::{BatchItem, BatchItemResult, BatchRequest, RemoteEndpoint, RemoteStatus};
use drift_store::{QueueStore, RecordStore, SyncQueueEntry, SyncStatus};

use crate::conflict::{ConflictResolver, Winner};
use crate::retry::RetryController;
use crate::status::StatusSnapshot;

/// Configuration for the sync engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Delivery attempts per entry before it is dead-lettered.
    pub max_retries: u32,
    /// Entries per batch request, sized for remote payload limits.
    pub batch_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            batch_size: 50,
        }
    }
}

/// One error recorded during a cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncError {
    pub record_id: RecordId,
    /// Absent for failures that precede any batch, such as the queue store
    /// being unreachable.
    pub operation: Option<Operation>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of one drain cycle. Returned unconditionally; partial failures
/// never surface as an Err.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResult {
    /// True iff no item failed this cycle. Resolved conflicts count as
    /// successes.
    pub success: bool,
    pub synced_items: usize,
    pub failed_items: usize,
    pub errors: Vec<SyncError>,
}

impl SyncResult {
    fn empty() -> Self {
        Self {
            success: true,
            synced_items: 0,
            failed_items: 0,
            errors: Vec::new(),
        }
    }
}

/// Sync engine coordinating the queue store, record store and remote
/// endpoint through one drain cycle at a time.
pub struct SyncEngine<Q, R, E>
where
    Q: QueueStore + ?Sized,
    R: RecordStore + ?Sized,
    E: RemoteEndpoint + ?Sized,
{
    queue: Arc<Q>,
    records: Arc<R>,
    remote: Arc<E>,
    resolver: ConflictResolver,
    retry: RetryController,
    config: SyncConfig,
    /// Serializes drain cycles. Two concurrent cycles would race on
    /// `remove` and double-count retries.
    cycle_lock: Mutex<()>,
}

impl<Q, R, E> SyncEngine<Q, R, E>
where
    Q: QueueStore + ?Sized,
    R: RecordStore + ?Sized,
    E: RemoteEndpoint + ?Sized,
{
    /// Create a new sync engine.
    pub fn new(queue: Arc<Q>, records: Arc<R>, remote: Arc<E>, config: SyncConfig) -> Self {
        let retry = RetryController::new(config.max_retries);
        Self {
            queue,
            records,
            remote,
            resolver: ConflictResolver::new(),
            retry,
            config,
            cycle_lock: Mutex::new(()),
        }
    }

    /// Get the engine configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run one full drain cycle: fetch due entries, deliver them in
    /// sequential batches, apply per-item outcomes.
    ///
    /// A cycle started while another is in flight waits for it; cycles
    /// never interleave. The returned result captures every failure — this
    /// method does not error.
    pub async fn sync(&self) -> SyncResult {
        let _guard = self.cycle_lock.lock().await;

        let due = match self.queue.list_due(self.config.max_retries).await {
            Ok(due) => due,
            Err(e) => {
                warn!("Sync cycle aborted, queue store unavailable: {}", e);
                return SyncResult {
                    success: false,
                    synced_items: 0,
                    failed_items: 0,
                    errors: vec![SyncError {
                        record_id: RecordId::sentinel(),
                        operation: None,
                        message: e.to_string(),
                        timestamp: Utc::now(),
                    }],
                };
            }
        };

        if due.is_empty() {
            debug!("Sync queue empty, nothing to do");
            return SyncResult::empty();
        }

        info!("Starting sync cycle with {} due entries", due.len());
        let mut result = SyncResult::empty();

        // Batches are dispatched strictly sequentially so that two
        // operations for the same record landing in different batches keep
        // their enqueue order at the remote.
        for batch in due.chunks(self.config.batch_size) {
            self.dispatch_batch(batch, &mut result).await;
        }

        result.success = result.failed_items == 0;
        info!(
            "Sync cycle finished: {} synced, {} failed",
            result.synced_items, result.failed_items
        );
        result
    }

    /// Aggregate queue depth, last sync time and connectivity. Store or
    /// probe failures degrade individual fields, never the call.
    pub async fn status(&self) -> StatusSnapshot {
        let pending_sync_count = match self.records.pending_count().await {
            Ok(count) => count,
            Err(e) => {
                warn!("Failed to count pending records: {}", e);
                0
            }
        };

        let last_sync_timestamp = match self.records.last_synced_at().await {
            Ok(ts) => ts,
            Err(e) => {
                warn!("Failed to read last sync time: {}", e);
                None
            }
        };

        let sync_queue_size = match self.queue.len().await {
            Ok(len) => len,
            Err(e) => {
                warn!("Failed to read queue size: {}", e);
                0
            }
        };

        StatusSnapshot {
            pending_sync_count,
            last_sync_timestamp,
            is_online: self.check_connectivity().await,
            sync_queue_size,
        }
    }

    /// Probe the remote. A failed probe is simply "offline".
    pub async fn check_connectivity(&self) -> bool {
        matches!(self.remote.check_health().await, Ok(true))
    }

    /// Entries that exhausted their retry budget, kept for inspection or
    /// manual replay.
    pub async fn dead_letters(&self) -> Result<Vec<SyncQueueEntry>> {
        self.queue.dead_letters(self.config.max_retries).await
    }

    async fn dispatch_batch(&self, batch: &[SyncQueueEntry], result: &mut SyncResult) {
        let items: Vec<BatchItem> = batch.iter().map(BatchItem::from).collect();
        let request = BatchRequest::new(items);
        debug!(
            "Dispatching batch of {} entries (checksum {:08x})",
            batch.len(),
            request.checksum
        );

        let responses = match self.remote.submit_batch(&request).await {
            Ok(responses) => responses,
            Err(e) => {
                // Transport failure takes the whole batch down; every item
                // consumes one retry attempt.
                warn!("Batch submission failed: {}", e);
                let message = e.to_string();
                for entry in batch {
                    self.record_failure(entry, &message, result).await;
                }
                return;
            }
        };

        // Response order is not guaranteed; client_id maps a result back to
        // its submitted entries.
        let mut by_record: HashMap<&RecordId, &BatchItemResult> = HashMap::new();
        for response in &responses {
            by_record.insert(&response.client_id, response);
        }

        for entry in batch {
            match by_record.get(&entry.record_id) {
                Some(response) => match response.status {
                    RemoteStatus::Success => self.apply_success(entry, response, result).await,
                    RemoteStatus::Conflict => self.apply_conflict(entry, response, result).await,
                    RemoteStatus::Error | RemoteStatus::Unknown => {
                        let message = response
                            .error
                            .clone()
                            .unwrap_or_else(|| "remote reported failure".to_string());
                        self.record_failure(entry, &message, result).await;
                    }
                },
                None => {
                    self.record_failure(entry, "no result returned for item", result)
                        .await;
                }
            }
        }
    }

    async fn apply_success(
        &self,
        entry: &SyncQueueEntry,
        response: &BatchItemResult,
        result: &mut SyncResult,
    ) {
        match self.finish_entry(entry, response.server_id.clone()).await {
            Ok(()) => result.synced_items += 1,
            Err(e) => {
                warn!(
                    "Failed to apply success for record {}: {}",
                    entry.record_id, e
                );
                result.failed_items += 1;
                result.errors.push(SyncError {
                    record_id: entry.record_id.clone(),
                    operation: Some(entry.operation),
                    message: e.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }
    }

    async fn apply_conflict(
        &self,
        entry: &SyncQueueEntry,
        response: &BatchItemResult,
        result: &mut SyncResult,
    ) {
        // Resolution picks a winner for the record's history; content
        // reconciliation is the authority's side of the contract, the
        // engine converges metadata. Missing timestamps fall to the remote.
        let local = drift_remote::payload_updated_at(&entry.payload);
        let remote = response
            .resolved_data
            .as_ref()
            .and_then(drift_remote::payload_updated_at);
        let winner = match (local, remote) {
            (Some(local), Some(remote)) => self.resolver.resolve(local, remote),
            _ => Winner::Remote,
        };
        debug!(
            "Conflict on record {}: {} version wins",
            entry.record_id,
            winner.as_str()
        );

        match self.finish_entry(entry, response.server_id.clone()).await {
            Ok(()) => {
                result.synced_items += 1;
                // Conflict is recorded, not treated as failure.
                result.errors.push(SyncError {
                    record_id: entry.record_id.clone(),
                    operation: Some(entry.operation),
                    message: format!("conflict resolved, {} version kept", winner.as_str()),
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                warn!(
                    "Failed to apply conflict resolution for record {}: {}",
                    entry.record_id, e
                );
                result.failed_items += 1;
                result.errors.push(SyncError {
                    record_id: entry.record_id.clone(),
                    operation: Some(entry.operation),
                    message: e.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }
    }

    /// Success path shared by Success and Conflict outcomes: converge the
    /// record's metadata, then clear its whole backlog — the delivered
    /// snapshot already reflects every earlier queued edit.
    async fn finish_entry(&self, entry: &SyncQueueEntry, server_id: Option<String>) -> Result<()> {
        self.records
            .update_sync_metadata(
                &entry.record_id,
                SyncStatus::Synced,
                server_id,
                Some(Utc::now()),
            )
            .await?;
        self.queue.remove(&entry.record_id).await?;
        Ok(())
    }

    async fn record_failure(&self, entry: &SyncQueueEntry, message: &str, result: &mut SyncResult) {
        if let Err(e) = self
            .retry
            .handle_failure(
                self.queue.as_ref(),
                self.records.as_ref(),
                entry,
                message,
            )
            .await
        {
            warn!(
                "Failure bookkeeping for record {} did not stick: {}",
                entry.record_id, e
            );
        }
        result.failed_items += 1;
        result.errors.push(SyncError {
            record_id: entry.record_id.clone(),
            operation: Some(entry.operation),
            message: message.to_string(),
            timestamp: Utc::now(),
        });
    }
}
