//! In-memory remote authority for testing and development.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use drift_common::{Error, Operation, RecordId, Result};

use crate::endpoint::{
    payload_updated_at, BatchItemResult, BatchRequest, RemoteEndpoint, RemoteStatus,
};

/// The authority's copy of one record.
#[derive(Debug, Clone)]
struct AuthorityRecord {
    server_id: String,
    payload: serde_json::Value,
    updated_at: Option<DateTime<Utc>>,
    deleted: bool,
}

/// In-memory remote authority.
///
/// Applies batches with the same semantics the real endpoint guarantees:
/// idempotent by record id, last-write-wins against its own copies, and a
/// Conflict result carrying `resolved_data` when its copy is newer than the
/// submitted snapshot. Failure injection covers the two transport states
/// the engine distinguishes: a total outage and per-item errors.
pub struct MemoryRemote {
    records: Arc<RwLock<HashMap<RecordId, AuthorityRecord>>>,
    failing_records: Arc<RwLock<HashSet<RecordId>>>,
    outage: AtomicBool,
    next_server_id: AtomicU64,
    batch_calls: AtomicUsize,
}

impl MemoryRemote {
    /// Create a new empty authority.
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            failing_records: Arc::new(RwLock::new(HashSet::new())),
            outage: AtomicBool::new(false),
            next_server_id: AtomicU64::new(1),
            batch_calls: AtomicUsize::new(0),
        }
    }

    /// Simulate the remote being unreachable. While set, every batch call
    /// fails with a transport error and the health probe reports offline.
    pub fn set_outage(&self, outage: bool) {
        self.outage.store(outage, Ordering::SeqCst);
    }

    /// Make every item for `record_id` come back with an Error status.
    pub fn fail_record(&self, record_id: RecordId) {
        self.failing_records.write().unwrap().insert(record_id);
    }

    /// Clear all per-item failure injection.
    pub fn clear_failures(&self) {
        self.failing_records.write().unwrap().clear();
    }

    /// Preload the authority with its own copy of a record, as if another
    /// client had synced it.
    pub fn seed(
        &self,
        record_id: RecordId,
        payload: serde_json::Value,
        updated_at: DateTime<Utc>,
    ) -> String {
        let server_id = self.allocate_server_id();
        self.records.write().unwrap().insert(
            record_id,
            AuthorityRecord {
                server_id: server_id.clone(),
                payload,
                updated_at: Some(updated_at),
                deleted: false,
            },
        );
        server_id
    }

    /// Number of batch submissions received.
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    /// The authority's current payload for a record, if it holds one.
    pub fn record_payload(&self, record_id: &RecordId) -> Option<serde_json::Value> {
        self.records
            .read()
            .unwrap()
            .get(record_id)
            .filter(|r| !r.deleted)
            .map(|r| r.payload.clone())
    }

    fn allocate_server_id(&self) -> String {
        format!("srv_{}", self.next_server_id.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteEndpoint for MemoryRemote {
    async fn submit_batch(&self, request: &BatchRequest) -> Result<Vec<BatchItemResult>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);

        if self.outage.load(Ordering::SeqCst) {
            return Err(Error::Transport("Simulated outage".to_string()));
        }

        let failing = self.failing_records.read().unwrap().clone();
        let mut records = self.records.write().unwrap();
        let mut results = Vec::with_capacity(request.items.len());

        for item in &request.items {
            if failing.contains(&item.client_id) {
                results.push(BatchItemResult {
                    client_id: item.client_id.clone(),
                    server_id: None,
                    status: RemoteStatus::Error,
                    resolved_data: None,
                    error: Some("validation failed".to_string()),
                });
                continue;
            }

            let incoming_updated_at = payload_updated_at(&item.payload);

            if let Some(existing) = records.get_mut(&item.client_id) {
                // The authority's copy is newer: report a conflict and hand
                // back its version so the client can converge.
                let newer_here = match (existing.updated_at, incoming_updated_at) {
                    (Some(ours), Some(theirs)) => !existing.deleted && ours > theirs,
                    _ => false,
                };
                if newer_here {
                    results.push(BatchItemResult {
                        client_id: item.client_id.clone(),
                        server_id: Some(existing.server_id.clone()),
                        status: RemoteStatus::Conflict,
                        resolved_data: Some(existing.payload.clone()),
                        error: None,
                    });
                    continue;
                }

                existing.payload = item.payload.clone();
                existing.updated_at = incoming_updated_at;
                existing.deleted = item.operation == Operation::Delete;
                results.push(BatchItemResult {
                    client_id: item.client_id.clone(),
                    server_id: Some(existing.server_id.clone()),
                    status: RemoteStatus::Success,
                    resolved_data: None,
                    error: None,
                });
            } else {
                let server_id = self.allocate_server_id();
                records.insert(
                    item.client_id.clone(),
                    AuthorityRecord {
                        server_id: server_id.clone(),
                        payload: item.payload.clone(),
                        updated_at: incoming_updated_at,
                        deleted: item.operation == Operation::Delete,
                    },
                );
                results.push(BatchItemResult {
                    client_id: item.client_id.clone(),
                    server_id: Some(server_id),
                    status: RemoteStatus::Success,
                    resolved_data: None,
                    error: None,
                });
            }
        }

        Ok(results)
    }

    async fn check_health(&self) -> Result<bool> {
        Ok(!self.outage.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{BatchItem, BatchRequest};
    use chrono::Duration;
    use serde_json::json;

    fn rid(s: &str) -> RecordId {
        RecordId::new(s).unwrap()
    }

    fn request(items: Vec<BatchItem>) -> BatchRequest {
        BatchRequest::new(items)
    }

    fn item(id: &str, operation: Operation, updated_at: DateTime<Utc>) -> BatchItem {
        BatchItem {
            client_id: rid(id),
            operation,
            payload: json!({"title": id, "updated_at": updated_at.to_rfc3339()}),
            enqueued_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_first_apply_assigns_server_id() {
        let remote = MemoryRemote::new();
        let results = remote
            .submit_batch(&request(vec![item("a", Operation::Create, Utc::now())]))
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, RemoteStatus::Success);
        assert_eq!(results[0].server_id.as_deref(), Some("srv_1"));
    }

    #[tokio::test]
    async fn test_resubmit_is_idempotent() {
        let remote = MemoryRemote::new();
        let batch = request(vec![item("a", Operation::Create, Utc::now())]);

        let first = remote.submit_batch(&batch).await.unwrap();
        let second = remote.submit_batch(&batch).await.unwrap();

        // Same record keeps the same server id across deliveries.
        assert_eq!(first[0].server_id, second[0].server_id);
        assert_eq!(second[0].status, RemoteStatus::Success);
    }

    #[tokio::test]
    async fn test_conflict_when_authority_copy_is_newer() {
        let remote = MemoryRemote::new();
        let now = Utc::now();
        remote.seed(rid("a"), json!({"title": "server version"}), now);

        let stale = item("a", Operation::Update, now - Duration::minutes(10));
        let results = remote.submit_batch(&request(vec![stale])).await.unwrap();

        assert_eq!(results[0].status, RemoteStatus::Conflict);
        assert_eq!(
            results[0].resolved_data,
            Some(json!({"title": "server version"}))
        );
        // The authority keeps its own copy.
        assert_eq!(
            remote.record_payload(&rid("a")),
            Some(json!({"title": "server version"}))
        );
    }

    #[tokio::test]
    async fn test_newer_client_copy_overwrites() {
        let remote = MemoryRemote::new();
        let now = Utc::now();
        remote.seed(rid("a"), json!({"title": "old"}), now - Duration::minutes(10));

        let fresh = item("a", Operation::Update, now);
        let results = remote.submit_batch(&request(vec![fresh.clone()])).await.unwrap();

        assert_eq!(results[0].status, RemoteStatus::Success);
        assert_eq!(remote.record_payload(&rid("a")), Some(fresh.payload));
    }

    #[tokio::test]
    async fn test_outage_fails_whole_batch() {
        let remote = MemoryRemote::new();
        remote.set_outage(true);

        let result = remote
            .submit_batch(&request(vec![item("a", Operation::Create, Utc::now())]))
            .await;
        assert!(matches!(result, Err(Error::Transport(_))));
        assert!(!remote.check_health().await.unwrap());

        remote.set_outage(false);
        assert!(remote.check_health().await.unwrap());
    }

    #[tokio::test]
    async fn test_per_item_failure_injection() {
        let remote = MemoryRemote::new();
        remote.fail_record(rid("bad"));

        let results = remote
            .submit_batch(&request(vec![
                item("good", Operation::Create, Utc::now()),
                item("bad", Operation::Create, Utc::now()),
            ]))
            .await
            .unwrap();

        assert_eq!(results[0].status, RemoteStatus::Success);
        assert_eq!(results[1].status, RemoteStatus::Error);
        assert_eq!(results[1].error.as_deref(), Some("validation failed"));
    }

    #[tokio::test]
    async fn test_delete_tombstones_record() {
        let remote = MemoryRemote::new();
        let now = Utc::now();
        remote
            .submit_batch(&request(vec![item("a", Operation::Create, now)]))
            .await
            .unwrap();
        remote
            .submit_batch(&request(vec![item(
                "a",
                Operation::Delete,
                now + Duration::seconds(1),
            )]))
            .await
            .unwrap();

        assert!(remote.record_payload(&rid("a")).is_none());
    }
}
