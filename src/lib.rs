//! Event check-in log: attendees are scanned or typed in, persisted to a local
//! SQLite file, and listed, searched, exported or deleted.
//!
//! # Examples
//!
//! Working set, duplicate guard and list projection without any storage:
//! ```
//! use checkin::{
//!     core::{guard, projection::{project, ListQuery}, roster::Roster},
//!     record::{AttendeeRecord, CheckInDraft},
//!     types::{SortDirection, SortField},
//! };
//!
//! let mut roster = Roster::new();
//! let draft = CheckInDraft::new("A001", "Jane").expect("draft");
//! guard::admit(&roster, &draft).expect("not yet checked in");
//! roster.upsert(AttendeeRecord::from_draft(draft, chrono::Utc::now()));
//!
//! assert!(guard::is_duplicate(&roster, "A001"));
//! let view = project(
//!     roster.iter(),
//!     &ListQuery::new("jan", SortField::DisplayName, SortDirection::Ascending),
//! );
//! assert_eq!(view.len(), 1);
//! ```
//!
//! Runtime usage with a SQLite store:
//! ```no_run
//! use checkin::{
//!     config::CheckInConfig,
//!     persist::sqlite::SqliteRecordStore,
//!     runtime::handle::spawn_checkin,
//!     sync::DisabledSync,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = SqliteRecordStore::new("checkin.db");
//! let handle = spawn_checkin(Box::new(store), Box::new(DisabledSync), CheckInConfig::default());
//! handle.open().await.expect("open");
//! handle.scan(r#"{"NIK":"3201","Nama":"Jane Doe"}"#).await.expect("scan");
//! let csv = handle.export_csv().await.expect("export");
//! assert!(csv.contains("Jane Doe"));
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```
#![deny(missing_docs)]

/// Runtime configuration loaded from the environment.
pub mod config;
/// Working set, duplicate guard and list projection.
pub mod core;
/// Error taxonomy.
pub mod error;
/// CSV export.
pub mod export;
/// Scan payload parsing and scan debouncing.
pub mod ingest;
/// Record store abstraction with SQLite and in-memory implementations.
pub mod persist;
/// Attendee records and check-in drafts.
pub mod record;
/// Single-writer runtime handle and events.
pub mod runtime;
/// Submission endpoint for the sync action.
pub mod sync;
/// Shared primitive types and enums.
pub mod types;
