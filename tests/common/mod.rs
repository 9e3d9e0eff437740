//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use neuroflex_store::backend::{BackendKind, KvStore, StorageBackend, WebStorage};
use neuroflex_store::records::{RecordStore, RetentionPolicy, TrainingRecord, RECORDS_KEY};
use neuroflex_store::sync::{RecordPayload, RemoteSink};
use neuroflex_store::{Result, StoreError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const NAMESPACE: &str = "neuroflex_";

pub fn memory_backend() -> Arc<WebStorage> {
    Arc::new(WebStorage::new(8 * 1024 * 1024))
}

pub fn store_on(backend: Arc<dyn StorageBackend>, max_records: usize) -> RecordStore {
    let policy = RetentionPolicy {
        max_records,
        ..RetentionPolicy::default()
    };
    RecordStore::new(KvStore::new(backend, NAMESPACE), policy)
}

pub fn memory_store(max_records: usize) -> RecordStore {
    store_on(memory_backend(), max_records)
}

/// Record completed `minutes_ago` minutes in the past
pub fn record(module: &str, minutes_ago: i64) -> TrainingRecord {
    TrainingRecord::new(module, Utc::now() - Duration::minutes(minutes_ago))
        .with_difficulty("normal")
        .with_score(50.0, 75.0)
        .with_duration(60_000)
}

pub fn record_days_ago(module: &str, days: i64) -> TrainingRecord {
    TrainingRecord::new(module, Utc::now() - Duration::days(days))
}

/// Device that can only hold `limit` records in the collection key
pub struct CappedDevice {
    inner: WebStorage,
    limit: usize,
}

impl CappedDevice {
    pub fn new(limit: usize) -> Self {
        Self {
            inner: WebStorage::new(8 * 1024 * 1024),
            limit,
        }
    }
}

#[async_trait]
impl StorageBackend for CappedDevice {
    fn kind(&self) -> BackendKind {
        BackendKind::Web
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        if key.ends_with(RECORDS_KEY) {
            let items: Vec<serde_json::Value> = serde_json::from_str(value)?;
            if items.len() > self.limit {
                return Err(StoreError::QuotaExceeded { key: key.to_string() });
            }
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key).await
    }

    async fn list_keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.inner.list_keys_with_prefix(prefix).await
    }
}

/// Remote that acknowledges batches with `cloud-<n>` ids
#[derive(Default)]
pub struct MockRemote {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
    pub batches: Mutex<Vec<(String, Vec<RecordPayload>)>>,
}

impl MockRemote {
    pub fn failing() -> Self {
        let remote = Self::default();
        remote.fail.store(true, Ordering::SeqCst);
        remote
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteSink for MockRemote {
    async fn upload_batch(&self, user_id: &str, batch: &[RecordPayload]) -> Result<Vec<String>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::SyncFailure("service unavailable".to_string()));
        }
        self.batches
            .lock()
            .unwrap()
            .push((user_id.to_string(), batch.to_vec()));
        Ok((0..batch.len())
            .map(|i| format!("cloud-{}-{}", call, i))
            .collect())
    }
}
