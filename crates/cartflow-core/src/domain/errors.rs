//! Errors - エラー型と分類
//!
//! One enum per collaborator, so the worker can tell a transport failure of
//! the queue (abort the cycle) from a provider failure (spend an attempt).

use thiserror::Error;

use super::ids::{ItemId, JobId};

/// Job queue failures.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The backend itself failed (connection, serialization, ...).
    #[error("queue backend error: {0}")]
    Backend(String),

    #[error("job {0} is already pending")]
    Duplicate(JobId),

    #[error("job {0} already reached a terminal state")]
    AlreadyTerminal(JobId),

    #[error("job {0} is not being processed")]
    NotProcessing(JobId),
}

/// Item store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("item {0} not found")]
    NotFound(ItemId),

    #[error("item store error: {0}")]
    Backend(String),
}

/// Reservation provider failures (network, timeout, non-success answer).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("reservation service unavailable: {0}")]
    Unavailable(String),

    #[error("unknown item: {0}")]
    UnknownItem(String),

    #[error("insufficient inventory for {item}: requested {requested}, available {available}")]
    InsufficientInventory {
        item: String,
        requested: u32,
        available: u32,
    },
}
