//! Aggregated sync status snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One-shot view of queue depth, last sync time and connectivity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Records the next cycle will pick up (status Pending or Error).
    /// Failed records need manual intervention and are not counted.
    pub pending_sync_count: usize,
    /// Latest successful sync across all records, `None` if never synced.
    pub last_sync_timestamp: Option<DateTime<Utc>>,
    /// Result of the bounded-timeout reachability probe.
    pub is_online: bool,
    /// Total queue entries, dead letters included.
    pub sync_queue_size: usize,
}
