use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use chrono::NaiveDate;
use tempfile::TempDir;

use checkin::{
    config::CheckInConfig,
    core::projection::ListQuery,
    error::CheckInError,
    persist::{
        RecordStore, StoreError, StoreResult, memory::MemoryRecordStore,
        sqlite::SqliteRecordStore,
    },
    record::{AttendeeRecord, CheckInDraft},
    runtime::{
        events::CheckInEvent,
        handle::{CheckInHandle, ScanOutcome, spawn_checkin},
    },
    sync::{DisabledSync, SyncEndpoint, SyncError, SyncReceipt},
    types::{SortDirection, SortField, StoreMode},
};

/// Memory store that counts writes.
struct CountingStore {
    inner: MemoryRecordStore,
    puts: Arc<AtomicUsize>,
}

impl RecordStore for CountingStore {
    fn open(&mut self) -> StoreResult<()> {
        self.inner.open()
    }
    fn is_open(&self) -> bool {
        self.inner.is_open()
    }
    fn is_durable(&self) -> bool {
        self.inner.is_durable()
    }
    fn put(&mut self, record: &AttendeeRecord) -> StoreResult<AttendeeRecord> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(record)
    }
    fn get_all(&self) -> StoreResult<Vec<AttendeeRecord>> {
        self.inner.get_all()
    }
    fn delete(&mut self, identifier: &str) -> StoreResult<()> {
        self.inner.delete(identifier)
    }
    fn clear_all(&mut self) -> StoreResult<()> {
        self.inner.clear_all()
    }
}

/// Store whose engine can never be opened, or whose writes always abort.
struct BrokenStore {
    fail_open: bool,
    inner: MemoryRecordStore,
}

impl RecordStore for BrokenStore {
    fn open(&mut self) -> StoreResult<()> {
        if self.fail_open {
            return Err(StoreError::StorageUnavailable("disabled by policy".to_string()));
        }
        self.inner.open()
    }
    fn is_open(&self) -> bool {
        self.inner.is_open()
    }
    fn put(&mut self, _record: &AttendeeRecord) -> StoreResult<AttendeeRecord> {
        Err(StoreError::WriteFailed("transaction aborted".to_string()))
    }
    fn get_all(&self) -> StoreResult<Vec<AttendeeRecord>> {
        self.inner.get_all()
    }
    fn delete(&mut self, _identifier: &str) -> StoreResult<()> {
        Err(StoreError::DeleteFailed("transaction aborted".to_string()))
    }
    fn clear_all(&mut self) -> StoreResult<()> {
        Err(StoreError::ClearFailed("transaction aborted".to_string()))
    }
}

/// Memory store whose reads and close can be switched to fail mid-test.
struct FlakyStore {
    inner: MemoryRecordStore,
    fail_reads: Arc<AtomicBool>,
    fail_close: bool,
}

impl RecordStore for FlakyStore {
    fn open(&mut self) -> StoreResult<()> {
        self.inner.open()
    }
    fn is_open(&self) -> bool {
        self.inner.is_open()
    }
    fn is_durable(&self) -> bool {
        self.inner.is_durable()
    }
    fn put(&mut self, record: &AttendeeRecord) -> StoreResult<AttendeeRecord> {
        self.inner.put(record)
    }
    fn get_all(&self) -> StoreResult<Vec<AttendeeRecord>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::ReadFailed("database disk image is malformed".to_string()));
        }
        self.inner.get_all()
    }
    fn delete(&mut self, identifier: &str) -> StoreResult<()> {
        self.inner.delete(identifier)
    }
    fn clear_all(&mut self) -> StoreResult<()> {
        self.inner.clear_all()
    }
    fn close(&mut self) -> StoreResult<()> {
        if self.fail_close {
            return Err(StoreError::CloseFailed("database is locked".to_string()));
        }
        self.inner.close()
    }
}

fn flaky(fail_reads: bool, fail_close: bool) -> (CheckInHandle, Arc<AtomicBool>) {
    let toggle = Arc::new(AtomicBool::new(fail_reads));
    let store = FlakyStore {
        inner: MemoryRecordStore::new(),
        fail_reads: Arc::clone(&toggle),
        fail_close,
    };
    let handle = spawn_checkin(Box::new(store), Box::new(DisabledSync), config(0));
    (handle, toggle)
}

struct RecordingSync {
    seen: Arc<AtomicUsize>,
}

impl SyncEndpoint for RecordingSync {
    fn submit(&mut self, records: &[AttendeeRecord]) -> Result<SyncReceipt, SyncError> {
        self.seen.fetch_add(records.len(), Ordering::SeqCst);
        Ok(SyncReceipt {
            offered: records.len(),
            transmitted: true,
        })
    }
}

fn config(cooldown_ms: u64) -> CheckInConfig {
    CheckInConfig {
        scan_cooldown: Duration::from_millis(cooldown_ms),
        ..CheckInConfig::default()
    }
}

fn counting(cooldown_ms: u64) -> (CheckInHandle, Arc<AtomicUsize>) {
    let puts = Arc::new(AtomicUsize::new(0));
    let store = CountingStore {
        inner: MemoryRecordStore::new(),
        puts: Arc::clone(&puts),
    };
    let handle = spawn_checkin(Box::new(store), Box::new(DisabledSync), config(cooldown_ms));
    (handle, puts)
}

fn draft(id: &str, name: &str) -> CheckInDraft {
    CheckInDraft::new(id, name).expect("draft")
}

#[tokio::test]
async fn operations_before_open_fail_and_open_is_idempotent() {
    let (handle, puts) = counting(0);

    assert!(matches!(handle.records().await, Err(CheckInError::NotInitialized)));
    assert!(matches!(
        handle.check_in(draft("A001", "Jane")).await,
        Err(CheckInError::NotInitialized)
    ));
    assert_eq!(handle.mode().await.expect("mode"), StoreMode::Unopened);

    assert_eq!(handle.open().await.expect("open"), StoreMode::InMemory);
    assert_eq!(handle.open().await.expect("reopen"), StoreMode::InMemory);
    assert_eq!(puts.load(Ordering::SeqCst), 0);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn duplicate_identifier_is_rejected_without_put() {
    let (handle, puts) = counting(0);
    handle.open().await.expect("open");

    handle.check_in(draft("A001", "Jane")).await.expect("first");
    let err = handle
        .check_in_manual(" A001 ", "Someone Else")
        .await
        .expect_err("duplicate");
    assert!(matches!(err, CheckInError::DuplicateIdentifier(id) if id == "A001"));
    assert_eq!(puts.load(Ordering::SeqCst), 1);

    let records = handle.records().await.expect("records");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].display_name, "Jane");

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn invalid_scan_payload_never_reaches_store() {
    let (handle, puts) = counting(0);
    handle.open().await.expect("open");
    let mut sub = handle.subscribe();

    let err = handle.scan(r#"{"NIK":"123"}"#).await.expect_err("invalid");
    assert!(matches!(err, CheckInError::InvalidPayload(_)));
    assert_eq!(puts.load(Ordering::SeqCst), 0);
    assert!(handle.records().await.expect("records").is_empty());

    let evt = tokio::time::timeout(Duration::from_secs(1), sub.recv())
        .await
        .expect("event")
        .expect("recv");
    assert!(matches!(evt, CheckInEvent::Rejected { identifier: None, .. }));

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn accepted_scan_opens_debounce_window() {
    let (handle, puts) = counting(60_000);
    handle.open().await.expect("open");

    let first = handle
        .scan(r#"{"NIK":"3201","Nama":"Jane Doe"}"#)
        .await
        .expect("scan");
    assert!(matches!(first, ScanOutcome::Accepted(ref rec) if rec.identifier == "3201"));

    let second = handle
        .scan(r#"{"NIK":"3202","Nama":"Alan"}"#)
        .await
        .expect("scan");
    assert_eq!(second, ScanOutcome::Suppressed);
    assert_eq!(puts.load(Ordering::SeqCst), 1);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn rejected_scan_does_not_arm_debounce() {
    let (handle, _puts) = counting(60_000);
    handle.open().await.expect("open");

    assert!(handle.scan("not json").await.is_err());
    let outcome = handle
        .scan(r#"{"NIK":"3201","Nama":"Jane Doe"}"#)
        .await
        .expect("scan");
    assert!(matches!(outcome, ScanOutcome::Accepted(_)));

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn unavailable_storage_degrades_to_memory() {
    let store = BrokenStore {
        fail_open: true,
        inner: MemoryRecordStore::new(),
    };
    let handle = spawn_checkin(Box::new(store), Box::new(DisabledSync), config(0));
    let mut sub = handle.subscribe();

    assert_eq!(handle.open().await.expect("open"), StoreMode::InMemory);
    let evt = tokio::time::timeout(Duration::from_secs(1), sub.recv())
        .await
        .expect("event")
        .expect("recv");
    assert!(matches!(evt, CheckInEvent::DegradedMode { .. }));

    handle.check_in(draft("A001", "Jane")).await.expect("in-memory check-in");
    assert_eq!(handle.records().await.expect("records").len(), 1);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn unavailable_storage_without_fallback_is_an_error() {
    let store = BrokenStore {
        fail_open: true,
        inner: MemoryRecordStore::new(),
    };
    let cfg = CheckInConfig {
        in_memory_fallback: false,
        ..CheckInConfig::default()
    };
    let handle = spawn_checkin(Box::new(store), Box::new(DisabledSync), cfg);

    assert!(matches!(
        handle.open().await,
        Err(CheckInError::StorageUnavailable(_))
    ));
    assert_eq!(handle.mode().await.expect("mode"), StoreMode::Unopened);
}

#[tokio::test]
async fn failed_writes_leave_working_set_untouched() {
    let store = BrokenStore {
        fail_open: false,
        inner: MemoryRecordStore::new(),
    };
    let handle = spawn_checkin(Box::new(store), Box::new(DisabledSync), config(0));
    handle.open().await.expect("open");

    assert!(matches!(
        handle.check_in(draft("A001", "Jane")).await,
        Err(CheckInError::WriteFailed(_))
    ));
    assert!(handle.records().await.expect("records").is_empty());
    assert!(matches!(handle.delete("A001").await, Err(CheckInError::DeleteFailed(_))));
    assert!(matches!(handle.clear_all().await, Err(CheckInError::ClearFailed(_))));

    // A persist failure does not arm anything: the same identifier can be retried by the caller.
    assert!(matches!(
        handle.check_in(draft("A001", "Jane")).await,
        Err(CheckInError::WriteFailed(_))
    ));

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn failed_initial_load_leaves_handle_unopened() {
    let (handle, fail_reads) = flaky(true, false);

    assert!(matches!(handle.open().await, Err(CheckInError::ReadFailed(_))));
    assert_eq!(handle.mode().await.expect("mode"), StoreMode::Unopened);
    assert!(matches!(handle.records().await, Err(CheckInError::NotInitialized)));

    fail_reads.store(false, Ordering::SeqCst);
    assert_eq!(handle.open().await.expect("retry"), StoreMode::InMemory);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn failed_reload_keeps_working_set() {
    let (handle, fail_reads) = flaky(false, false);
    handle.open().await.expect("open");
    handle.check_in(draft("A001", "Jane")).await.expect("check in");
    let before = handle.records().await.expect("records");

    fail_reads.store(true, Ordering::SeqCst);
    let mut sub = handle.subscribe();
    assert!(matches!(handle.reload().await, Err(CheckInError::ReadFailed(_))));
    assert_eq!(handle.records().await.expect("records"), before);
    assert!(matches!(
        handle.check_in(draft("A001", "Jane")).await,
        Err(CheckInError::DuplicateIdentifier(_))
    ));

    // Only the duplicate rejection is emitted; the failed reload emits nothing.
    let evt = tokio::time::timeout(Duration::from_secs(1), sub.recv())
        .await
        .expect("event")
        .expect("recv");
    assert!(matches!(evt, CheckInEvent::Rejected { identifier: Some(ref id), .. } if id == "A001"));

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn blank_manual_entry_is_rejected_with_event() {
    let (handle, puts) = counting(0);
    handle.open().await.expect("open");
    let mut sub = handle.subscribe();

    let err = handle.check_in_manual("   ", "Jane").await.expect_err("blank id");
    assert!(matches!(err, CheckInError::InvalidPayload(_)));
    assert_eq!(puts.load(Ordering::SeqCst), 0);

    let evt = tokio::time::timeout(Duration::from_secs(1), sub.recv())
        .await
        .expect("event")
        .expect("recv");
    assert!(matches!(evt, CheckInEvent::Rejected { identifier: None, .. }));

    let rec = handle.check_in_manual(" A001 ", " Jane ").await.expect("trimmed");
    assert_eq!((rec.identifier.as_str(), rec.display_name.as_str()), ("A001", "Jane"));

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn close_failure_is_reported_and_loop_stops() {
    let (handle, _fail_reads) = flaky(false, true);
    handle.open().await.expect("open");

    assert!(matches!(handle.shutdown().await, Err(CheckInError::CloseFailed(_))));
    assert!(matches!(handle.records().await, Err(CheckInError::ChannelClosed)));
}

#[tokio::test]
async fn sqlite_runtime_lists_exports_and_survives_restart() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("checkin.db");

    let handle = spawn_checkin(
        Box::new(SqliteRecordStore::new(&db_path)),
        Box::new(DisabledSync),
        config(0),
    );
    assert_eq!(handle.open().await.expect("open"), StoreMode::Durable);

    handle.check_in(draft("A1", "Jane")).await.expect("jane");
    tokio::time::sleep(Duration::from_millis(5)).await;
    handle.check_in(draft("A2", "Alan")).await.expect("alan");
    tokio::time::sleep(Duration::from_millis(5)).await;
    handle.check_in(draft("A3", "Jo\"hn")).await.expect("john");

    let names: Vec<String> = handle
        .list(ListQuery::new("", SortField::DisplayName, SortDirection::Ascending))
        .await
        .expect("list")
        .into_iter()
        .map(|r| r.display_name)
        .collect();
    assert_eq!(names, vec!["Alan", "Jane", "Jo\"hn"]);

    let filtered = handle
        .list(ListQuery::new("JAN", SortField::CheckedInAt, SortDirection::Descending))
        .await
        .expect("list");
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].identifier, "A1");

    let csv = handle.export_csv().await.expect("csv");
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[1].starts_with("\"A1\",\"Jane\","));
    assert!(lines[3].starts_with("\"A3\",\"Jo\"\"hn\","));

    let date = NaiveDate::from_ymd_opt(2026, 10, 19).expect("date");
    let path = handle
        .export_to(tmp.path().to_path_buf(), date)
        .await
        .expect("export file");
    assert!(path.ends_with("checkin-export-2026-10-19.csv"));
    assert_eq!(std::fs::read_to_string(&path).expect("read"), csv);

    let before = handle.records().await.expect("records");
    handle.shutdown().await.expect("shutdown");

    let handle = spawn_checkin(
        Box::new(SqliteRecordStore::new(&db_path)),
        Box::new(DisabledSync),
        config(0),
    );
    handle.open().await.expect("reopen");
    assert_eq!(handle.records().await.expect("records"), before);

    handle.delete("A2").await.expect("delete");
    handle.delete("missing").await.expect("delete missing");
    assert_eq!(handle.reload().await.expect("reload"), 2);

    handle.clear_all().await.expect("clear");
    assert_eq!(handle.reload().await.expect("reload"), 0);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn events_follow_command_order() {
    let (handle, _puts) = counting(0);
    let mut sub = handle.subscribe();

    handle.open().await.expect("open");
    handle.check_in(draft("A001", "Jane")).await.expect("check in");
    handle.delete("A001").await.expect("delete");
    handle.clear_all().await.expect("clear");

    let mut seen = Vec::new();
    for _ in 0..4 {
        let evt = tokio::time::timeout(Duration::from_secs(1), sub.recv())
            .await
            .expect("event")
            .expect("recv");
        seen.push(evt);
    }

    assert_eq!(
        seen,
        vec![
            CheckInEvent::Opened { mode: StoreMode::InMemory, count: 0 },
            CheckInEvent::CheckedIn { identifier: "A001".to_string() },
            CheckInEvent::Deleted { identifier: "A001".to_string(), existed: true },
            CheckInEvent::Cleared { removed: 0 },
        ]
    );

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn sync_hands_records_to_endpoint_once() {
    let seen = Arc::new(AtomicUsize::new(0));
    let handle = spawn_checkin(
        Box::new(MemoryRecordStore::new()),
        Box::new(RecordingSync { seen: Arc::clone(&seen) }),
        config(0),
    );
    handle.open().await.expect("open");
    handle.check_in(draft("A001", "Jane")).await.expect("jane");
    handle.check_in(draft("A002", "Alan")).await.expect("alan");

    let receipt = handle.sync().await.expect("sync");
    assert_eq!(receipt, SyncReceipt { offered: 2, transmitted: true });
    assert_eq!(seen.load(Ordering::SeqCst), 2);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn disabled_sync_transmits_nothing() {
    let (handle, _puts) = counting(0);
    handle.open().await.expect("open");
    handle.check_in(draft("A001", "Jane")).await.expect("jane");

    let receipt = handle.sync().await.expect("sync");
    assert!(!receipt.transmitted);
    assert_eq!(receipt.offered, 1);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn racing_check_ins_for_one_identifier_admit_exactly_one() {
    let (handle, puts) = counting(0);
    handle.open().await.expect("open");

    let a = handle.clone();
    let b = handle.clone();
    let (ra, rb) = tokio::join!(
        a.check_in(draft("A001", "Scanner")),
        b.check_in(draft("A001", "Manual")),
    );

    assert_eq!(ra.is_ok() as u8 + rb.is_ok() as u8, 1);
    assert_eq!(puts.load(Ordering::SeqCst), 1);
    assert_eq!(handle.records().await.expect("records").len(), 1);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn calls_after_shutdown_report_closed_channel() {
    let (handle, _puts) = counting(0);
    handle.open().await.expect("open");
    handle.shutdown().await.expect("shutdown");

    assert!(matches!(handle.records().await, Err(CheckInError::ChannelClosed)));
}
