//! SQLite-backed attendee store.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, params};
use tracing::debug;

use crate::record::AttendeeRecord;

use super::{RecordStore, StoreError, StoreResult};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    File(PathBuf),
    Memory,
}

/// SQLite implementation of [`crate::persist::RecordStore`].
///
/// One row per attendee in the `attendees` table, keyed by identifier.
pub struct SqliteRecordStore {
    location: Location,
    conn: Option<Connection>,
}

impl SqliteRecordStore {
    /// Creates an unopened store backed by the database file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            location: Location::File(path.as_ref().to_path_buf()),
            conn: None,
        }
    }

    /// Creates an unopened store backed by a private in-memory database.
    pub fn new_in_memory() -> Self {
        Self {
            location: Location::Memory,
            conn: None,
        }
    }

    /// Opens or creates the database at `path`.
    ///
    /// Enables WAL mode and sets `synchronous=NORMAL`.
    pub fn open_at(path: impl AsRef<Path>) -> StoreResult<Self> {
        let mut store = Self::new(path);
        store.open()?;
        Ok(store)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        let mut store = Self::new_in_memory();
        store.open()?;
        Ok(store)
    }

    /// Database file path, or `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::File(path) => Some(path),
            Location::Memory => None,
        }
    }

    fn conn(&self) -> StoreResult<&Connection> {
        self.conn.as_ref().ok_or(StoreError::NotInitialized)
    }

    fn conn_mut(&mut self) -> StoreResult<&mut Connection> {
        self.conn.as_mut().ok_or(StoreError::NotInitialized)
    }

    fn init_connection(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(())
    }
}

impl RecordStore for SqliteRecordStore {
    fn open(&mut self) -> StoreResult<()> {
        if self.conn.is_some() {
            return Ok(());
        }

        let unavailable = |e: rusqlite::Error| StoreError::StorageUnavailable(e.to_string());
        let conn = match &self.location {
            Location::File(path) if path.as_os_str().is_empty() => {
                return Err(StoreError::StorageUnavailable(
                    "database path is empty".to_string(),
                ));
            }
            Location::File(path) => Connection::open(path).map_err(unavailable)?,
            Location::Memory => Connection::open_in_memory().map_err(unavailable)?,
        };
        Self::init_connection(&conn).map_err(unavailable)?;
        debug!(location = ?self.location, "attendee store opened");
        self.conn = Some(conn);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    fn put(&mut self, record: &AttendeeRecord) -> StoreResult<AttendeeRecord> {
        let failed = |e: rusqlite::Error| StoreError::WriteFailed(e.to_string());
        let tx = self.conn_mut()?.transaction().map_err(failed)?;
        tx.execute(
            "INSERT INTO attendees(identifier, display_name, checked_in_ms) VALUES (?1, ?2, ?3)
             ON CONFLICT(identifier) DO UPDATE SET
                 display_name = excluded.display_name,
                 checked_in_ms = excluded.checked_in_ms",
            params![
                record.identifier,
                record.display_name,
                record.checked_in_ms()
            ],
        )
        .map_err(failed)?;
        tx.commit().map_err(failed)?;

        Ok(AttendeeRecord {
            checked_in_at: AttendeeRecord::instant_from_ms(record.checked_in_ms()),
            ..record.clone()
        })
    }

    fn get_all(&self) -> StoreResult<Vec<AttendeeRecord>> {
        let failed = |e: rusqlite::Error| StoreError::ReadFailed(e.to_string());
        let mut stmt = self
            .conn()?
            .prepare(
                "SELECT identifier, display_name, checked_in_ms FROM attendees
                 ORDER BY checked_in_ms DESC, identifier ASC",
            )
            .map_err(failed)?;

        let rows = stmt
            .query_map([], |row| {
                let checked_in_ms: i64 = row.get(2)?;
                Ok(AttendeeRecord {
                    identifier: row.get(0)?,
                    display_name: row.get(1)?,
                    checked_in_at: AttendeeRecord::instant_from_ms(checked_in_ms),
                })
            })
            .map_err(failed)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(failed)?);
        }
        Ok(out)
    }

    fn delete(&mut self, identifier: &str) -> StoreResult<()> {
        let failed = |e: rusqlite::Error| StoreError::DeleteFailed(e.to_string());
        let tx = self.conn_mut()?.transaction().map_err(failed)?;
        tx.execute("DELETE FROM attendees WHERE identifier = ?1", params![identifier])
            .map_err(failed)?;
        tx.commit().map_err(failed)?;
        Ok(())
    }

    fn clear_all(&mut self) -> StoreResult<()> {
        let failed = |e: rusqlite::Error| StoreError::ClearFailed(e.to_string());
        let tx = self.conn_mut()?.transaction().map_err(failed)?;
        let removed = tx.execute("DELETE FROM attendees", []).map_err(failed)?;
        tx.commit().map_err(failed)?;
        debug!(removed, "attendee store cleared");
        Ok(())
    }

    fn close(&mut self) -> StoreResult<()> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .map_err(|(_, e)| StoreError::CloseFailed(e.to_string()))?;
        }
        Ok(())
    }
}
