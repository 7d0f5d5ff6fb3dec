use hashbrown::HashMap;

use crate::{
    persist::newest_first,
    record::AttendeeRecord,
    types::Identifier,
};

/// In-memory working set of checked-in attendees, keyed by identifier.
///
/// The duplicate guard trusts this set, so every successful store write,
/// delete, clear and reload must be mirrored here.
#[derive(Debug, Default, Clone)]
pub struct Roster {
    records: HashMap<Identifier, AttendeeRecord>,
}

impl Roster {
    /// Empty working set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a roster from a store listing. Later duplicates win.
    pub fn from_records(records: impl IntoIterator<Item = AttendeeRecord>) -> Self {
        let mut roster = Self::new();
        roster.replace_all(records);
        roster
    }

    /// Discards the current contents and loads `records`. Later duplicates win.
    pub fn replace_all(&mut self, records: impl IntoIterator<Item = AttendeeRecord>) {
        self.records.clear();
        for rec in records {
            self.records.insert(rec.identifier.clone(), rec);
        }
    }

    /// True when `identifier` is checked in.
    pub fn contains(&self, identifier: &str) -> bool {
        self.records.contains_key(identifier)
    }

    /// Record held under `identifier`, if any.
    pub fn get(&self, identifier: &str) -> Option<&AttendeeRecord> {
        self.records.get(identifier)
    }

    /// Inserts or replaces; returns the record previously held under the key.
    pub fn upsert(&mut self, record: AttendeeRecord) -> Option<AttendeeRecord> {
        self.records.insert(record.identifier.clone(), record)
    }

    /// Removes and returns the record under `identifier`.
    pub fn remove(&mut self, identifier: &str) -> Option<AttendeeRecord> {
        self.records.remove(identifier)
    }

    /// Empties the set and returns how many records it held.
    pub fn clear(&mut self) -> usize {
        let n = self.records.len();
        self.records.clear();
        n
    }

    /// Number of checked-in attendees.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nobody is checked in.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &AttendeeRecord> {
        self.records.values()
    }

    /// Records in store listing order: newest check-in first.
    pub fn newest_first(&self) -> Vec<&AttendeeRecord> {
        let mut out: Vec<&AttendeeRecord> = self.records.values().collect();
        out.sort_by(|a, b| newest_first(a, b));
        out
    }

    /// Owned copy of [`Roster::newest_first`].
    pub fn newest_first_cloned(&self) -> Vec<AttendeeRecord> {
        self.newest_first().into_iter().cloned().collect()
    }
}
