//! Runtime event stream payloads.

use crate::types::{Identifier, StoreMode};

/// Events emitted from the single-writer runtime loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckInEvent {
    /// The store opened and the working set was loaded.
    Opened {
        /// Persistence mode now in effect.
        mode: StoreMode,
        /// Records loaded into the working set.
        count: usize,
    },
    /// Durable storage could not be opened; check-ins last for this session only.
    DegradedMode {
        /// Why the durable store was unavailable.
        reason: String,
    },
    /// An attendee was checked in and persisted.
    CheckedIn {
        /// Checked-in identifier.
        identifier: Identifier,
    },
    /// A check-in attempt was turned away without touching the working set.
    Rejected {
        /// Identifier, when the payload got far enough to carry one.
        identifier: Option<Identifier>,
        /// User-facing reason.
        reason: String,
    },
    /// A record was deleted.
    Deleted {
        /// Deleted identifier.
        identifier: Identifier,
        /// False when the identifier was not checked in.
        existed: bool,
    },
    /// Every record was removed.
    Cleared {
        /// Records dropped from the working set.
        removed: usize,
    },
    /// The working set was reloaded from the store.
    Reloaded {
        /// Records now in the working set.
        count: usize,
    },
    /// The sync endpoint accepted a submission.
    Synced {
        /// Records offered to the endpoint.
        offered: usize,
        /// Whether anything was actually sent.
        transmitted: bool,
    },
}
