//! Wire contract with the remote batch endpoint.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use drift_common::{Operation, RecordId, Result};
use drift_store::SyncQueueEntry;

/// One queued operation as submitted to the remote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    /// The client-side record id; the remote echoes it back so results can
    /// be mapped to submitted items regardless of response order.
    pub client_id: RecordId,
    pub operation: Operation,
    /// Full-record snapshot, including its `updated_at`.
    pub payload: serde_json::Value,
    pub enqueued_at: DateTime<Utc>,
}

impl From<&SyncQueueEntry> for BatchItem {
    fn from(entry: &SyncQueueEntry) -> Self {
        Self {
            client_id: entry.record_id.clone(),
            operation: entry.operation,
            payload: entry.payload.clone(),
            enqueued_at: entry.enqueued_at,
        }
    }
}

/// A bounded-size group of operations submitted in one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Items in submission order; the checksum covers this order.
    pub items: Vec<BatchItem>,
    pub client_timestamp: DateTime<Utc>,
    /// CRC32 over the ordered (client_id, operation) pairs.
    pub checksum: u32,
}

impl BatchRequest {
    /// Build a request for `items`, computing the integrity checksum.
    pub fn new(items: Vec<BatchItem>) -> Self {
        let checksum = batch_checksum(&items);
        Self {
            items,
            client_timestamp: Utc::now(),
            checksum,
        }
    }
}

/// Integrity checksum over the ordered (record id, operation) pairs of a
/// batch, so the server can reject a request whose item list was mangled
/// in transit.
pub fn batch_checksum(items: &[BatchItem]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    for item in items {
        hasher.update(item.client_id.as_str().as_bytes());
        hasher.update(item.operation.as_str().as_bytes());
    }
    hasher.finalize()
}

/// Read the `updated_at` modification timestamp a record snapshot carries.
///
/// Payloads are full-record snapshots, so by convention they embed the
/// record's own `updated_at` as an RFC 3339 string; it is what both sides
/// compare for last-write-wins resolution.
pub fn payload_updated_at(payload: &serde_json::Value) -> Option<DateTime<Utc>> {
    payload
        .get("updated_at")
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Per-item outcome reported by the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStatus {
    Success,
    Conflict,
    Error,
    /// Any status string this client does not recognize; treated as a
    /// failure by the dispatcher.
    #[serde(other)]
    Unknown,
}

/// Result for one submitted item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItemResult {
    pub client_id: RecordId,
    /// Remote-assigned identifier, present on first successful apply.
    #[serde(default)]
    pub server_id: Option<String>,
    pub status: RemoteStatus,
    /// The authority's copy of the record, supplied on conflict.
    #[serde(default)]
    pub resolved_data: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Capability handle to the remote authority.
#[async_trait]
pub trait RemoteEndpoint: Send + Sync {
    /// Submit one batch. Returns one result per submitted item; order is
    /// not guaranteed, `client_id` maps a result back to its item.
    async fn submit_batch(&self, request: &BatchRequest) -> Result<Vec<BatchItemResult>>;

    /// Bounded-timeout reachability probe.
    async fn check_health(&self) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(id: &str, operation: Operation) -> BatchItem {
        BatchItem {
            client_id: RecordId::new(id).unwrap(),
            operation,
            payload: json!({}),
            enqueued_at: Utc::now(),
        }
    }

    #[test]
    fn test_checksum_covers_order() {
        let a = item("a", Operation::Create);
        let b = item("b", Operation::Update);

        let forward = batch_checksum(&[a.clone(), b.clone()]);
        let reversed = batch_checksum(&[b, a]);
        assert_ne!(forward, reversed);
    }

    #[test]
    fn test_checksum_ignores_payload() {
        let mut a = item("a", Operation::Create);
        let before = batch_checksum(std::slice::from_ref(&a));
        a.payload = json!({"changed": true});
        let after = batch_checksum(std::slice::from_ref(&a));
        assert_eq!(before, after);
    }

    #[test]
    fn test_checksum_covers_operation() {
        let create = batch_checksum(&[item("a", Operation::Create)]);
        let delete = batch_checksum(&[item("a", Operation::Delete)]);
        assert_ne!(create, delete);
    }

    #[test]
    fn test_unknown_status_decodes() {
        let result: BatchItemResult = serde_json::from_value(json!({
            "client_id": "rec_1",
            "status": "throttled"
        }))
        .unwrap();
        assert_eq!(result.status, RemoteStatus::Unknown);
        assert!(result.server_id.is_none());
    }

    #[test]
    fn test_payload_updated_at() {
        let ts = Utc::now();
        let payload = json!({"title": "note", "updated_at": ts.to_rfc3339()});
        assert_eq!(payload_updated_at(&payload), Some(ts));

        assert!(payload_updated_at(&json!({})).is_none());
        assert!(payload_updated_at(&json!({"updated_at": "yesterday"})).is_none());
    }

    #[test]
    fn test_batch_item_from_entry() {
        let entry = SyncQueueEntry::new(
            RecordId::new("rec_1").unwrap(),
            Operation::Update,
            json!({"v": 2}),
        );
        let item = BatchItem::from(&entry);
        assert_eq!(item.client_id, entry.record_id);
        assert_eq!(item.operation, Operation::Update);
        assert_eq!(item.payload, entry.payload);
    }
}
