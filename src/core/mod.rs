//! In-memory working set, duplicate guard and list projection.

/// Duplicate-identifier check against the working set.
pub mod guard;
/// Filtered, sorted list views.
pub mod projection;
/// Cached copy of every persisted record.
pub mod roster;
