//! Record store abstraction and its implementations.

/// Session-only store used for degraded mode and tests.
pub mod memory;
/// Durable SQLite store.
pub mod sqlite;

use std::cmp::Ordering;

use thiserror::Error;

use crate::record::AttendeeRecord;

/// Failures raised by a [`RecordStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backing engine could not be opened or initialized.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    /// Called before a successful `open`, or after `close`.
    #[error("store is not open")]
    NotInitialized,
    /// `put` did not commit.
    #[error("write failed: {0}")]
    WriteFailed(String),
    /// `get_all` could not read the table.
    #[error("read failed: {0}")]
    ReadFailed(String),
    /// `delete` did not commit.
    #[error("delete failed: {0}")]
    DeleteFailed(String),
    /// `clear_all` did not commit.
    #[error("clear failed: {0}")]
    ClearFailed(String),
    /// The engine refused to release its connection.
    #[error("close failed: {0}")]
    CloseFailed(String),
}

/// Result alias for [`RecordStore`] operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Durable keyed storage for attendee records.
///
/// Every operation other than [`RecordStore::open`] fails with
/// [`StoreError::NotInitialized`] until `open` has succeeded.
pub trait RecordStore: Send {
    /// Opens the backing engine and creates the schema. Idempotent.
    fn open(&mut self) -> StoreResult<()>;
    /// True between a successful `open` and `close`.
    fn is_open(&self) -> bool;
    /// False for stores whose contents do not survive the process.
    fn is_durable(&self) -> bool {
        true
    }
    /// Inserts or replaces the record keyed by its identifier.
    fn put(&mut self, record: &AttendeeRecord) -> StoreResult<AttendeeRecord>;
    /// Every record, newest check-in first.
    fn get_all(&self) -> StoreResult<Vec<AttendeeRecord>>;
    /// Removes `identifier`; absent keys are not an error.
    fn delete(&mut self, identifier: &str) -> StoreResult<()>;
    /// Removes every record.
    fn clear_all(&mut self) -> StoreResult<()>;
    /// Releases the engine. Later calls fail with `NotInitialized` until
    /// `open` is called again.
    fn close(&mut self) -> StoreResult<()> {
        Ok(())
    }
}

/// Ordering used by [`RecordStore::get_all`]: newest first, then identifier.
pub fn newest_first(a: &AttendeeRecord, b: &AttendeeRecord) -> Ordering {
    b.checked_in_at
        .cmp(&a.checked_in_at)
        .then_with(|| a.identifier.cmp(&b.identifier))
}
