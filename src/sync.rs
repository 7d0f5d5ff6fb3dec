//! Submission endpoint used by the "sync" action.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::record::AttendeeRecord;

/// Failures reported by a [`SyncEndpoint`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The endpoint received the records and refused them.
    #[error("endpoint rejected submission: {0}")]
    Rejected(String),
    /// The endpoint could not be contacted.
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),
}

/// Outcome of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReceipt {
    /// Records handed to the endpoint.
    pub offered: usize,
    /// True only if the records actually left this process.
    pub transmitted: bool,
}

/// External collaborator that receives the current attendee list.
///
/// Called once per sync action; failures are reported, never retried or queued.
pub trait SyncEndpoint: Send {
    /// Submits `records`, newest check-in first.
    fn submit(&mut self, records: &[AttendeeRecord]) -> Result<SyncReceipt, SyncError>;
}

/// Endpoint that accepts every submission and transmits nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSync;

impl SyncEndpoint for DisabledSync {
    fn submit(&mut self, records: &[AttendeeRecord]) -> Result<SyncReceipt, SyncError> {
        info!(count = records.len(), "sync requested but no endpoint is configured");
        Ok(SyncReceipt {
            offered: records.len(),
            transmitted: false,
        })
    }
}
