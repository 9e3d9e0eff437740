//! Integration tests for the storage context
//!
//! Opens real on-disk backends under a temp directory and exercises backup,
//! settings and statistics through the composed API.

mod common;

use async_trait::async_trait;
use common::*;
use neuroflex_store::backend::{BackendKind, StorageBackend, WebStorage};
use neuroflex_store::config::StoreConfig;
use neuroflex_store::{Result, StorageContext};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Web storage that remembers every key it is asked about
struct KeyRecorder {
    inner: WebStorage,
    seen: Mutex<Vec<String>>,
}

impl KeyRecorder {
    fn new() -> Self {
        Self {
            inner: WebStorage::new(1024 * 1024),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn note(&self, key: &str) {
        self.seen.lock().unwrap().push(key.to_string());
    }
}

#[async_trait]
impl StorageBackend for KeyRecorder {
    fn kind(&self) -> BackendKind {
        BackendKind::Web
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.note(key);
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.note(key);
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.note(key);
        self.inner.remove(key).await
    }

    async fn list_keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.note(prefix);
        self.inner.list_keys_with_prefix(prefix).await
    }
}

fn config_in(dir: &TempDir, kind: BackendKind) -> StoreConfig {
    let mut config = StoreConfig::default();
    config.backend.kind = kind;
    config.backend.data_dir = dir.path().display().to_string();
    config
}

#[tokio::test]
async fn test_auto_prefers_native_when_writable() {
    let dir = TempDir::new().unwrap();
    let ctx = StorageContext::open(&config_in(&dir, BackendKind::Auto))
        .await
        .unwrap();

    assert_eq!(ctx.backend_kind(), BackendKind::Native);
    assert!(ctx.is_available());
}

#[tokio::test]
async fn test_web_snapshot_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir, BackendKind::Web);

    {
        let ctx = StorageContext::open(&config).await.unwrap();
        ctx.records()
            .save(record("stroop", 1).with_id("kept"))
            .await
            .unwrap();
    }

    let ctx = StorageContext::open(&config).await.unwrap();
    assert!(ctx.records().get("kept").await.is_some());
}

#[tokio::test]
async fn test_backup_between_backends() {
    let dir = TempDir::new().unwrap();
    let native = StorageContext::open(&config_in(&dir, BackendKind::Native))
        .await
        .unwrap();
    for i in 0..3 {
        native.records().save(record("audio", i)).await.unwrap();
    }
    let json = native.export_json().await.unwrap();

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["version"], "1.0");
    assert_eq!(value["stats"]["totalRecords"], 3);
    assert_eq!(value["userSettings"]["autoSync"], true);

    let other = TempDir::new().unwrap();
    let web = StorageContext::open(&config_in(&other, BackendKind::Web))
        .await
        .unwrap();
    let summary = web.import_json(&json).await.unwrap();
    assert_eq!(summary.imported, 3);

    // A second import adds nothing
    let again = web.import_json(&json).await.unwrap();
    assert_eq!(again.imported, 0);
    assert_eq!(again.total, 3);
    assert_eq!(web.records().export().await, native.records().export().await);
}

#[tokio::test]
async fn test_import_rejects_foreign_document() {
    let dir = TempDir::new().unwrap();
    let ctx = StorageContext::open(&config_in(&dir, BackendKind::Native))
        .await
        .unwrap();

    assert!(ctx.import_json(r#"{"records": []}"#).await.is_err());
    assert!(ctx.records().is_empty().await);
}

#[tokio::test]
async fn test_settings_patch_and_stats() {
    let dir = TempDir::new().unwrap();
    let ctx = StorageContext::open(&config_in(&dir, BackendKind::Native))
        .await
        .unwrap();

    let settings = ctx
        .user_data()
        .update_settings(serde_json::json!({ "theme": "dark" }))
        .await
        .unwrap();
    assert_eq!(settings.theme, "dark");
    assert_eq!(settings.language, "zh-CN");

    ctx.records().save(record("stroop", 2)).await.unwrap();
    ctx.records().save(record("audio", 1)).await.unwrap();

    let stats = ctx.stats().compute_stats().await;
    assert_eq!(stats.total_records, 2);
    assert_eq!(stats.module_stats.len(), 2);

    let usage = ctx.stats().storage_usage().await.unwrap();
    assert_eq!(usage.item_count, 2);
    assert!(usage.total_size > 0);
}

#[tokio::test]
async fn test_clear_all_only_touches_namespace() {
    let dir = TempDir::new().unwrap();
    let mut config = config_in(&dir, BackendKind::Native);
    let ctx = StorageContext::open(&config).await.unwrap();
    ctx.records().save(record("a", 1)).await.unwrap();

    config.storage.namespace = "other_".to_string();
    let neighbour = StorageContext::open(&config).await.unwrap();
    neighbour.records().save(record("b", 1)).await.unwrap();

    assert_eq!(ctx.clear_all().await.unwrap(), 1);
    assert!(ctx.records().is_empty().await);
    assert_eq!(neighbour.records().len().await, 1);
}

#[tokio::test]
async fn test_startup_keys_stay_in_namespace() {
    let backend = Arc::new(KeyRecorder::new());
    let ctx = StorageContext::with_backend(backend.clone(), &StoreConfig::default()).await;
    assert!(ctx.is_available());
    ctx.records().save(record("stroop", 1)).await.unwrap();
    ctx.stats().storage_usage().await.unwrap();

    let seen = backend.seen.lock().unwrap();
    assert!(!seen.is_empty());
    for key in seen.iter() {
        assert!(key.starts_with(NAMESPACE), "key outside namespace: {}", key);
    }
}
