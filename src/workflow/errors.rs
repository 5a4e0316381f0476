//! Workflow error types.
//!
//! Only transport and workflow failures reach callers of a stage. Store
//! failures are recovered inside [`super::store::DurableSlotStore`] and never
//! leave it.

use thiserror::Error;

use crate::client::TransportError;

/// Errors surfaced by stage operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The remote call could not complete. Passed through unmodified.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The service answered with `success: false`.
    #[error("{message}")]
    WorkflowFailed { message: String },

    /// An uploaded file could not be read. No remote call was made.
    #[error("failed to read file '{path}': {reason}")]
    FileRead { path: String, reason: String },
}

/// Errors raised by slot store back-ends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite operation failed.
    #[error("database error: {reason}")]
    DatabaseError { reason: String },

    /// Value could not be serialized or deserialized.
    #[error("serialization error: {reason}")]
    SerializationError { reason: String },

    /// Writing the value would exceed the store's capacity.
    #[error("quota exceeded writing '{key}': {needed} bytes over a {quota}-byte quota")]
    QuotaExceeded { key: String, needed: usize, quota: usize },

    /// A previous holder of the store lock panicked.
    #[error("store lock poisoned")]
    LockPoisoned,
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::DatabaseError {
            reason: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::SerializationError {
            reason: e.to_string(),
        }
    }
}
