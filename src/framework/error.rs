//! # Store Errors
//!
//! Errors produced by the record store plumbing itself, as opposed to a
//! record refusing a change.

/// Errors that can occur while talking to a `RecordActor`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store actor closed")]
    Closed,
    #[error("Store actor dropped response channel")]
    Dropped,
    #[error("Record not found: {0}")]
    NotFound(String),
    #[error("Record rejected: {0}")]
    Rejected(Box<dyn std::error::Error + Send + Sync>),
}
