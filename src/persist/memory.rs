//! Volatile [`RecordStore`] used when durable storage is unavailable.

use hashbrown::HashMap;

use crate::record::AttendeeRecord;

use super::{RecordStore, StoreError, StoreResult, newest_first};

/// Session-only store. Contents are lost when it is dropped or closed.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Option<HashMap<String, AttendeeRecord>>,
}

impl MemoryRecordStore {
    /// Creates an unopened store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that is already open.
    pub fn opened() -> Self {
        Self {
            records: Some(HashMap::new()),
        }
    }

    fn records(&self) -> StoreResult<&HashMap<String, AttendeeRecord>> {
        self.records.as_ref().ok_or(StoreError::NotInitialized)
    }

    fn records_mut(&mut self) -> StoreResult<&mut HashMap<String, AttendeeRecord>> {
        self.records.as_mut().ok_or(StoreError::NotInitialized)
    }
}

impl RecordStore for MemoryRecordStore {
    fn open(&mut self) -> StoreResult<()> {
        if self.records.is_none() {
            self.records = Some(HashMap::new());
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.records.is_some()
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn put(&mut self, record: &AttendeeRecord) -> StoreResult<AttendeeRecord> {
        self.records_mut()?
            .insert(record.identifier.clone(), record.clone());
        Ok(record.clone())
    }

    fn get_all(&self) -> StoreResult<Vec<AttendeeRecord>> {
        let mut out: Vec<AttendeeRecord> = self.records()?.values().cloned().collect();
        out.sort_by(newest_first);
        Ok(out)
    }

    fn delete(&mut self, identifier: &str) -> StoreResult<()> {
        self.records_mut()?.remove(identifier);
        Ok(())
    }

    fn clear_all(&mut self) -> StoreResult<()> {
        self.records_mut()?.clear();
        Ok(())
    }

    fn close(&mut self) -> StoreResult<()> {
        self.records = None;
        Ok(())
    }
}
