use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{
    record::AttendeeRecord,
    types::{SortDirection, SortField},
};

/// Field plus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortKey {
    /// Primary comparison field.
    pub field: SortField,
    /// Applied to the primary comparison only; the identifier tie-break is
    /// always ascending.
    pub direction: SortDirection,
}

impl SortKey {
    /// Pairs a field with a direction.
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }
}

/// Filter text and ordering for a list view.
///
/// The default query matches everything, newest check-in first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListQuery {
    /// Case-insensitive substring matched against name and identifier.
    /// Whitespace is significant.
    pub filter: String,
    /// Ordering of the matched records.
    pub sort: SortKey,
}

impl ListQuery {
    /// Query matching `filter`, ordered by `field` in `direction`.
    pub fn new(filter: impl Into<String>, field: SortField, direction: SortDirection) -> Self {
        Self {
            filter: filter.into(),
            sort: SortKey::new(field, direction),
        }
    }
}

/// Filters and orders `records` into a fresh list. The source is untouched.
pub fn project<'a, I>(records: I, query: &ListQuery) -> Vec<AttendeeRecord>
where
    I: IntoIterator<Item = &'a AttendeeRecord>,
{
    let needle = query.filter.to_lowercase();
    let mut out: Vec<AttendeeRecord> = records
        .into_iter()
        .filter(|rec| matches_filter(rec, &needle))
        .cloned()
        .collect();
    out.sort_by(|a, b| compare(a, b, query.sort));
    out
}

/// True when `needle` occurs in the lowercased name or identifier.
///
/// `needle` must already be lowercased. Empty matches everything.
pub fn matches_filter(rec: &AttendeeRecord, needle: &str) -> bool {
    needle.is_empty()
        || rec.display_name.to_lowercase().contains(needle)
        || rec.identifier.to_lowercase().contains(needle)
}

/// Orders two records by `key`; ties fall back to identifier ascending.
pub fn compare(a: &AttendeeRecord, b: &AttendeeRecord, key: SortKey) -> Ordering {
    let primary = match key.field {
        SortField::CheckedInAt => a.checked_in_at.cmp(&b.checked_in_at),
        SortField::DisplayName => collate(&a.display_name, &b.display_name),
        SortField::Identifier => collate(&a.identifier, &b.identifier),
    };
    let primary = match key.direction {
        SortDirection::Ascending => primary,
        SortDirection::Descending => primary.reverse(),
    };
    primary.then_with(|| a.identifier.cmp(&b.identifier))
}

/// Case-insensitive comparison, with the raw text as tie-break so
/// "alan" and "Alan" still order deterministically.
pub fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
