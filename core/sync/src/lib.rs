//! Drift Sync Engine
//!
//! This module provides the offline-first synchronization core, including:
//! - A batch dispatcher draining the durable operation queue in order
//! - Last-write-wins conflict resolution
//! - Bounded retries with a dead-letter path for exhausted entries
//! - An aggregated status snapshot (queue depth, last sync, connectivity)
//!
//! Storage and transport are injected through the `drift-store` and
//! `drift-remote` traits, so one engine serves any backing store or wire.

pub mod conflict;
pub mod engine;
pub mod retry;
pub mod status;

// Re-export main types
pub use conflict::{ConflictResolver, Winner};
pub use engine::{SyncConfig, SyncEngine, SyncError, SyncResult};
pub use retry::{Escalation, RetryController};
pub use status::StatusSnapshot;
