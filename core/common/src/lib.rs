//! Common utilities and types shared across Drift modules.
//!
//! This module provides the foundational types used throughout the codebase:
//! record identifiers, the operation kind carried by queue entries, and the
//! shared error type.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{Operation, RecordId};
