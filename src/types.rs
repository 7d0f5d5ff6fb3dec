//! Shared primitive types and list-ordering enums.

use serde::{Deserialize, Serialize};

/// Attendee identifier ("NIK"), the unique record key.
pub type Identifier = String;
/// Check-in instant as milliseconds since the Unix epoch.
pub type TimestampMs = i64;

/// Record field a list can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortField {
    /// Check-in instant, compared numerically.
    #[default]
    CheckedInAt,
    /// Display name, compared with collation.
    DisplayName,
    /// Identifier, compared with collation.
    Identifier,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortDirection {
    /// Smallest first.
    Ascending,
    /// Largest first.
    #[default]
    Descending,
}

/// Where check-ins are currently being persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreMode {
    /// `open` has not completed yet.
    Unopened,
    /// Backed by a durable store.
    Durable,
    /// Durable storage was unavailable; records live for this session only.
    InMemory,
}
