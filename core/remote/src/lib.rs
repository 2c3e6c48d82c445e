//! Remote authority abstraction for Drift.
//!
//! This module defines the wire contract with the remote batch endpoint and
//! a trait-based interface over it, so cycle orchestration can be tested
//! against deterministic fakes.
//!
//! # Design Principles
//! - Transport isolation: no HTTP details leak into the sync engine
//! - Bounded timeouts: every network call has a deadline; a timeout is just
//!   another transport error
//! - Idempotent by record id: resubmitting an already-applied item is safe

pub mod endpoint;
pub mod http;
pub mod memory;

pub use endpoint::{
    batch_checksum, payload_updated_at, BatchItem, BatchItemResult, BatchRequest, RemoteEndpoint,
    RemoteStatus,
};
pub use http::HttpRemote;
pub use memory::MemoryRemote;
