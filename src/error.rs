//! Error taxonomy surfaced by the check-in handle.

use thiserror::Error;

use crate::{persist::StoreError, sync::SyncError, types::Identifier};

/// Every failure a check-in operation can report.
///
/// None of these are fatal: callers surface them once and carry on.
#[derive(Debug, Error)]
pub enum CheckInError {
    /// Durable storage could not be opened and no fallback applied.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// An operation ran before `open` completed.
    #[error("store used before open completed")]
    NotInitialized,

    /// A check-in could not be persisted.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Records could not be loaded from the store.
    #[error("read failed: {0}")]
    ReadFailed(String),

    /// A delete could not be persisted.
    #[error("delete failed: {0}")]
    DeleteFailed(String),

    /// Clearing the store failed.
    #[error("clear failed: {0}")]
    ClearFailed(String),

    /// The store could not be closed cleanly during shutdown.
    #[error("close failed: {0}")]
    CloseFailed(String),

    /// Scan payload or manual input is malformed or blank.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The identifier is already checked in.
    #[error("identifier {0} is already checked in")]
    DuplicateIdentifier(Identifier),

    /// The sync endpoint reported a failure.
    #[error("sync failed: {0}")]
    Sync(#[from] SyncError),

    /// The CSV export could not be produced or written.
    #[error("export failed: {0}")]
    Export(String),

    /// A blocking storage task panicked or was cancelled.
    #[error("storage worker failed: {0}")]
    Worker(String),

    /// The runtime loop has stopped.
    #[error("check-in runtime is not running")]
    ChannelClosed,
}

impl From<StoreError> for CheckInError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::StorageUnavailable(msg) => Self::StorageUnavailable(msg),
            StoreError::NotInitialized => Self::NotInitialized,
            StoreError::WriteFailed(msg) => Self::WriteFailed(msg),
            StoreError::ReadFailed(msg) => Self::ReadFailed(msg),
            StoreError::DeleteFailed(msg) => Self::DeleteFailed(msg),
            StoreError::ClearFailed(msg) => Self::ClearFailed(msg),
            StoreError::CloseFailed(msg) => Self::CloseFailed(msg),
        }
    }
}

/// Result alias for handle operations.
pub type CheckInResult<T> = Result<T, CheckInError>;
