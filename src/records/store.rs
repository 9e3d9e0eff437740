//! Record store: identity, retention, filtering and dedup
//!
//! The whole collection lives under one key as a JSON array. Every
//! mutation runs through a single async mutex: the in-memory index is
//! copied, transformed, written back in full, and only then replaces the
//! authoritative copy. Concurrent callers therefore never lose each
//! other's updates.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::index::{sort_newest_first, RecordIndex};
use super::model::{generate_id, ImportSummary, RecordFilter, SyncMark, TrainingRecord};
use crate::backend::KvStore;
use crate::config::StorageConfig;
use crate::errors::{Result, StoreError};

/// Key holding the record collection (before namespacing)
pub const RECORDS_KEY: &str = "training_records";

/// Retention limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Maximum records kept; oldest by `completed_at` are evicted first
    pub max_records: usize,
    /// Age horizon evicted when a write hits the device quota
    pub quota_recovery_days: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_records: 1000,
            quota_recovery_days: 30,
        }
    }
}

impl From<&StorageConfig> for RetentionPolicy {
    fn from(config: &StorageConfig) -> Self {
        Self {
            max_records: config.max_records,
            quota_recovery_days: config.quota_recovery_days,
        }
    }
}

/// Persistent collection of training records
pub struct RecordStore {
    kv: KvStore,
    policy: RetentionPolicy,
    index: Mutex<Option<RecordIndex>>,
}

impl RecordStore {
    pub fn new(kv: KvStore, policy: RetentionPolicy) -> Self {
        Self {
            kv,
            policy,
            index: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// Save a record, replacing any record with the same id.
    ///
    /// Assigns an id when empty, stamps `saved_at`, and enforces the
    /// retention cap in the same write. Returns the record id. A record
    /// that quota recovery would have to evict fails with
    /// [`StoreError::StorageFull`] instead of being dropped.
    pub async fn save(&self, mut record: TrainingRecord) -> Result<String> {
        if record.id.is_empty() {
            record.id = generate_id();
        }
        let now = Utc::now();
        let cap = self.policy.max_records;
        let keep = record.id.clone();

        let (id, _) = self
            .mutate_keeping("save", Some(&keep), |index| {
                record.saved_at = Some(now);
                record.is_local = true;

                match index.get(&record.id) {
                    Some(existing) if existing.synced => {
                        record.synced = true;
                        record.synced_at = existing.synced_at;
                        record.cloud_id = existing.cloud_id.clone();
                    }
                    _ => {
                        record.synced = false;
                        record.synced_at = None;
                        record.cloud_id = None;
                    }
                }

                let id = record.id.clone();
                index.upsert(record);
                let evicted = index.sort_and_truncate(cap);
                if !evicted.is_empty() {
                    debug!(count = evicted.len(), "retention cap evicted oldest records");
                }
                (id, true)
            })
            .await?;

        Ok(id)
    }

    /// Records matching `filter`, newest first
    pub async fn list(&self, filter: &RecordFilter) -> Vec<TrainingRecord> {
        let mut records: Vec<TrainingRecord> = self
            .read(|index| {
                index
                    .records()
                    .iter()
                    .filter(|r| filter.matches(r))
                    .cloned()
                    .collect()
            })
            .await;
        sort_newest_first(&mut records);
        records
    }

    /// Records not yet acknowledged by the remote service, newest first
    pub async fn unsynced(&self) -> Vec<TrainingRecord> {
        self.list(&RecordFilter::new().synced(false)).await
    }

    pub async fn get(&self, id: &str) -> Option<TrainingRecord> {
        self.read(|index| index.get(id).cloned()).await
    }

    pub async fn len(&self) -> usize {
        self.read(|index| index.len()).await
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Mark one record synced. Returns false when the id is unknown.
    pub async fn mark_synced(&self, id: &str, cloud_id: Option<&str>) -> Result<bool> {
        let now = Utc::now();
        let (found, _) = self
            .mutate("mark_synced", |index| match index.get_mut(id) {
                Some(record) => {
                    let changed = record.apply_sync(cloud_id, now);
                    (true, changed)
                }
                None => (false, false),
            })
            .await?;
        Ok(found)
    }

    /// Mark every known id synced in one write.
    ///
    /// Returns how many distinct records were found; a repeated id counts
    /// once and its first mark wins.
    pub async fn mark_many_synced(&self, marks: &[SyncMark]) -> Result<usize> {
        let now = Utc::now();
        let (updated, _) = self
            .mutate("mark_many_synced", |index| {
                let mut seen = HashSet::new();
                let mut changed = false;
                for mark in marks {
                    if !seen.insert(mark.id.as_str()) {
                        continue;
                    }
                    match index.get_mut(&mark.id) {
                        Some(record) => {
                            changed |= record.apply_sync(mark.cloud_id.as_deref(), now);
                        }
                        None => {
                            seen.remove(mark.id.as_str());
                        }
                    }
                }
                (seen.len(), changed)
            })
            .await?;
        Ok(updated)
    }

    /// Remove a record. Returns false when it was not present.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let (removed, _) = self
            .mutate("delete", |index| {
                let removed = index.remove(id).is_some();
                (removed, removed)
            })
            .await?;
        Ok(removed)
    }

    /// Remove records completed strictly before `now - days_old` days
    pub async fn clean_older_than(&self, days_old: u32) -> Result<usize> {
        let cutoff = cutoff(days_old);
        let (removed, _) = self
            .mutate("clean_older_than", |index| {
                let removed = index.remove_completed_before(cutoff);
                (removed, removed > 0)
            })
            .await?;
        if removed > 0 {
            info!(removed, days_old, "cleaned old training records");
        }
        Ok(removed)
    }

    /// Free space for another key after a quota failure
    pub async fn reclaim_space(&self) -> Result<usize> {
        self.clean_older_than(self.policy.quota_recovery_days).await
    }

    /// Merge external records. Existing ids are never overwritten.
    pub async fn import(&self, records: Vec<TrainingRecord>) -> Result<ImportSummary> {
        let cap = self.policy.max_records;
        let (imported, total) = self
            .mutate("import", |index| {
                let mut added = Vec::new();
                for mut record in records {
                    if record.id.is_empty() {
                        record.id = generate_id();
                    }
                    let id = record.id.clone();
                    if index.insert_new(record) {
                        added.push(id);
                    }
                }
                let evicted = index.sort_and_truncate(cap);
                let kept = added.iter().filter(|id| index.contains(id)).count();
                (kept, !added.is_empty() || !evicted.is_empty())
            })
            .await?;

        info!(imported, total, "imported training records");
        Ok(ImportSummary { imported, total })
    }

    /// The full collection in stored order
    pub async fn export(&self) -> Vec<TrainingRecord> {
        self.read(|index| index.records().to_vec()).await
    }

    /// Drop the in-memory copy so the next access re-reads the backend
    pub async fn reload(&self) {
        let mut guard = self.index.lock().await;
        *guard = None;
    }

    async fn read<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&RecordIndex) -> T,
    {
        let mut guard = self.index.lock().await;
        if guard.is_none() {
            *guard = Some(self.load().await);
        }
        match guard.as_ref() {
            Some(index) => f(index),
            None => f(&RecordIndex::default()),
        }
    }

    /// Run one read-modify-write pass.
    ///
    /// `f` returns its result and whether it changed anything; unchanged
    /// passes skip the write. Returns the result and the final size.
    async fn mutate<T, F>(&self, op: &'static str, f: F) -> Result<(T, usize)>
    where
        F: FnOnce(&mut RecordIndex) -> (T, bool),
    {
        self.mutate_keeping(op, None, f).await
    }

    /// [`Self::mutate`], refusing quota recovery that would evict `keep`
    async fn mutate_keeping<T, F>(
        &self,
        op: &'static str,
        keep: Option<&str>,
        f: F,
    ) -> Result<(T, usize)>
    where
        F: FnOnce(&mut RecordIndex) -> (T, bool),
    {
        let mut guard = self.index.lock().await;
        let mut next = match guard.take() {
            Some(index) => index,
            None => self.load().await,
        };
        let snapshot = next.clone();

        let (value, changed) = f(&mut next);
        if !changed {
            let total = next.len();
            *guard = Some(next);
            return Ok((value, total));
        }

        match self.persist(&mut next, keep).await {
            Ok(()) => {
                debug!(op, total = next.len(), "record collection written");
                let total = next.len();
                *guard = Some(next);
                Ok((value, total))
            }
            Err(e) => {
                *guard = Some(snapshot);
                Err(e)
            }
        }
    }

    /// Write the collection, recovering once from a quota failure
    async fn persist(&self, index: &mut RecordIndex, keep: Option<&str>) -> Result<()> {
        match self.kv.set(RECORDS_KEY, index.records()).await {
            Err(e) if e.is_quota() => {
                let days = self.policy.quota_recovery_days;
                let storage_full = || StoreError::StorageFull {
                    key: self.kv.full_key(RECORDS_KEY),
                    reclaimed_days: days,
                };

                let kept_before = keep.map_or(false, |id| index.contains(id));
                let removed = index.remove_completed_before(cutoff(days));
                if kept_before && keep.map_or(false, |id| !index.contains(id)) {
                    warn!(days, "quota recovery would evict the record being saved");
                    return Err(storage_full());
                }
                warn!(removed, days, "storage quota exceeded, evicted old records and retrying");

                self.kv
                    .set(RECORDS_KEY, index.records())
                    .await
                    .map_err(|retry| if retry.is_quota() { storage_full() } else { retry })
            }
            other => other,
        }
    }

    /// Read the persisted collection, skipping entries that fail to parse
    async fn load(&self) -> RecordIndex {
        let raw: Vec<serde_json::Value> = self.kv.get(RECORDS_KEY, Vec::new()).await;
        let mut records = Vec::with_capacity(raw.len());
        for value in raw {
            match serde_json::from_value::<TrainingRecord>(value) {
                Ok(record) => records.push(record),
                Err(e) => warn!(error = %e, "skipping unreadable training record"),
            }
        }
        debug!(count = records.len(), "loaded training records");
        RecordIndex::from_records(records)
    }
}

fn cutoff(days_old: u32) -> DateTime<Utc> {
    Utc::now() - Duration::days(i64::from(days_old))
}
