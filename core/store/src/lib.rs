//! Storage contracts for the Drift sync engine.
//!
//! This module provides the two narrow interfaces the engine mutates state
//! through — the durable operation queue and the record store's sync
//! metadata — together with in-memory implementations for testing and
//! development.
//!
//! # Design Principles
//! - Narrow contracts: all queue and record mutation goes through these
//!   traits, no component touches the underlying storage directly
//! - Atomic per call: each trait method is a single durable step, so a crash
//!   between batch send and queue update loses no entries (at-least-once
//!   delivery; the remote is idempotent by record id)
//! - Async operations: stores may be backed by real I/O

pub mod memory;
pub mod queue;
pub mod record;

pub use memory::{MemoryQueueStore, MemoryRecordStore};
pub use queue::{QueueStore, SyncQueueEntry};
pub use record::{Record, RecordStore, SyncStatus};
