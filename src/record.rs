//! Attendee record and check-in draft types.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::CheckInError,
    types::{Identifier, TimestampMs},
};

/// Fully materialized, persisted check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeRecord {
    /// Unique attendee key.
    pub identifier: Identifier,
    /// Human-readable attendee name.
    pub display_name: String,
    /// Instant the attendee was checked in.
    pub checked_in_at: DateTime<Utc>,
}

impl AttendeeRecord {
    /// Builds a record from a validated draft stamped at `checked_in_at`.
    ///
    /// The instant is truncated to whole milliseconds so the in-memory copy
    /// matches what a store hands back after a reload.
    pub fn from_draft(draft: CheckInDraft, checked_in_at: DateTime<Utc>) -> Self {
        Self {
            identifier: draft.identifier,
            display_name: draft.display_name,
            checked_in_at: Self::instant_from_ms(checked_in_at.timestamp_millis()),
        }
    }

    /// Check-in instant in epoch milliseconds, the persisted form.
    pub fn checked_in_ms(&self) -> TimestampMs {
        self.checked_in_at.timestamp_millis()
    }

    /// Rebuilds the check-in instant from its persisted form.
    ///
    /// Out-of-range values clamp to the Unix epoch.
    pub fn instant_from_ms(ms: TimestampMs) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

/// Check-in payload before a timestamp is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInDraft {
    /// Attendee identifier.
    pub identifier: Identifier,
    /// Attendee display name.
    pub display_name: String,
}

impl CheckInDraft {
    /// Trims both fields and rejects drafts with an empty field.
    pub fn new(
        identifier: impl AsRef<str>,
        display_name: impl AsRef<str>,
    ) -> Result<Self, CheckInError> {
        let identifier = identifier.as_ref().trim();
        let display_name = display_name.as_ref().trim();
        if identifier.is_empty() {
            return Err(CheckInError::InvalidPayload("identifier is empty".to_string()));
        }
        if display_name.is_empty() {
            return Err(CheckInError::InvalidPayload("display name is empty".to_string()));
        }
        Ok(Self {
            identifier: identifier.to_string(),
            display_name: display_name.to_string(),
        })
    }
}
