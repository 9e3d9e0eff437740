// In-memory authoritative index of the record collection
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::model::TrainingRecord;

/// Ordered record collection with id lookup.
///
/// Order is the persisted array order. Ids are unique.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordIndex {
    records: Vec<TrainingRecord>,
    positions: HashMap<String, usize>,
}

impl RecordIndex {
    /// Build from persisted records, keeping the first occurrence of an id
    pub fn from_records(records: Vec<TrainingRecord>) -> Self {
        let mut index = Self::default();
        for record in records {
            index.insert_new(record);
        }
        index
    }

    pub fn records(&self) -> &[TrainingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&TrainingRecord> {
        self.positions.get(id).map(|&i| &self.records[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut TrainingRecord> {
        match self.positions.get(id) {
            Some(&i) => Some(&mut self.records[i]),
            None => None,
        }
    }

    /// Replace in place or append. Returns true when an existing record was replaced.
    pub fn upsert(&mut self, record: TrainingRecord) -> bool {
        match self.positions.get(&record.id) {
            Some(&i) => {
                self.records[i] = record;
                true
            }
            None => {
                self.positions.insert(record.id.clone(), self.records.len());
                self.records.push(record);
                false
            }
        }
    }

    /// Append only if the id is unseen. Returns true when added.
    pub fn insert_new(&mut self, record: TrainingRecord) -> bool {
        if self.contains(&record.id) {
            return false;
        }
        self.positions.insert(record.id.clone(), self.records.len());
        self.records.push(record);
        true
    }

    pub fn remove(&mut self, id: &str) -> Option<TrainingRecord> {
        let i = self.positions.remove(id)?;
        let record = self.records.remove(i);
        self.reindex();
        Some(record)
    }

    /// Keep records matching `keep`. Returns how many were dropped.
    pub fn retain<F>(&mut self, keep: F) -> usize
    where
        F: FnMut(&TrainingRecord) -> bool,
    {
        let before = self.records.len();
        self.records.retain(keep);
        let removed = before - self.records.len();
        if removed > 0 {
            self.reindex();
        }
        removed
    }

    /// Drop records completed strictly before `cutoff`
    pub fn remove_completed_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        self.retain(|r| r.completed_at >= cutoff)
    }

    /// Stable sort newest first, then cut to `cap`. Returns the evicted ids.
    pub fn sort_and_truncate(&mut self, cap: usize) -> Vec<String> {
        sort_newest_first(&mut self.records);
        let evicted: Vec<String> = if self.records.len() > cap {
            self.records.drain(cap..).map(|r| r.id).collect()
        } else {
            Vec::new()
        };
        self.reindex();
        evicted
    }

    fn reindex(&mut self) {
        self.positions = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();
    }
}

/// Descending by `completed_at`; ties keep their relative order
pub(crate) fn sort_newest_first(records: &mut [TrainingRecord]) {
    records.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
}
