//! Integration tests for the record store
//!
//! Drives RecordStore through the public API over the in-memory web backend,
//! the native preference store, and a quota-limited device.

mod common;

use common::*;
use neuroflex_store::backend::PreferencesStore;
use neuroflex_store::records::{RecordFilter, SyncMark, TrainingRecord};
use neuroflex_store::StoreError;
use quickcheck_macros::quickcheck;
use std::collections::HashSet;
use std::sync::Arc;

#[tokio::test]
async fn test_save_same_id_twice_keeps_second() {
    let store = memory_store(1000);

    store.save(record("stroop", 5).with_id("a")).await.unwrap();
    store
        .save(record("stroop", 5).with_id("a").with_score(99.0, 100.0))
        .await
        .unwrap();

    let records = store.export().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].score, 99.0);
    assert!(records[0].saved_at.is_some());
    assert!(records[0].is_local);
}

#[tokio::test]
async fn test_save_assigns_unique_ids() {
    let store = memory_store(1000);
    let mut ids = HashSet::new();
    for i in 0..50 {
        ids.insert(store.save(record("audio", i)).await.unwrap());
    }
    assert_eq!(ids.len(), 50);
    assert!(ids.iter().all(|id| id.starts_with("local_")));
}

#[tokio::test]
async fn test_cap_evicts_single_oldest() {
    let store = memory_store(3);
    store.save(record("a", 30).with_id("oldest")).await.unwrap();
    store.save(record("a", 20).with_id("mid")).await.unwrap();
    store.save(record("a", 10).with_id("newer")).await.unwrap();
    store.save(record("a", 0).with_id("newest")).await.unwrap();

    let ids: Vec<String> = store.export().await.into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["newest", "newer", "mid"]);
}

#[tokio::test]
async fn test_saving_older_than_everything_at_cap_is_dropped() {
    let store = memory_store(2);
    store.save(record("a", 1)).await.unwrap();
    store.save(record("a", 2)).await.unwrap();
    let id = store.save(record("a", 100)).await.unwrap();

    assert_eq!(store.len().await, 2);
    assert!(store.get(&id).await.is_none());
}

#[tokio::test]
async fn test_list_filters_and_orders() {
    let store = memory_store(1000);
    store.save(record("stroop", 30).with_id("s-old")).await.unwrap();
    store.save(record("audio", 20).with_id("a")).await.unwrap();
    store.save(record("stroop", 10).with_id("s-new")).await.unwrap();
    store.save(record("stroop", 5).with_id("s-synced")).await.unwrap();
    store.mark_synced("s-synced", Some("c1")).await.unwrap();

    let listed = store
        .list(&RecordFilter::new().module("stroop").synced(false))
        .await;
    let ids: Vec<&str> = listed.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["s-new", "s-old"]);
}

#[tokio::test]
async fn test_list_date_range_is_half_open() {
    let store = memory_store(1000);
    let inside = record("a", 60).with_id("inside");
    let boundary = record("a", 30).with_id("boundary");
    let start = inside.completed_at;
    let end = boundary.completed_at;
    store.save(inside).await.unwrap();
    store.save(boundary).await.unwrap();

    let listed = store.list(&RecordFilter::new().since(start).until(end)).await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "inside");
}

#[tokio::test]
async fn test_mark_synced_is_idempotent() {
    let store = memory_store(1000);
    store.save(record("a", 1).with_id("x")).await.unwrap();

    assert!(store.mark_synced("x", Some("cloud-x")).await.unwrap());
    let first = store.get("x").await.unwrap();
    assert!(store.mark_synced("x", None).await.unwrap());
    let second = store.get("x").await.unwrap();

    assert!(second.synced);
    assert_eq!(second.cloud_id.as_deref(), Some("cloud-x"));
    assert_eq!(first.synced_at, second.synced_at);
    assert!(!store.mark_synced("missing", None).await.unwrap());
}

#[tokio::test]
async fn test_resave_never_unsyncs() {
    let store = memory_store(1000);
    store.save(record("a", 1).with_id("x")).await.unwrap();
    store.mark_synced("x", Some("c")).await.unwrap();

    store.save(record("a", 1).with_id("x").with_score(1.0, 1.0)).await.unwrap();
    let saved = store.get("x").await.unwrap();
    assert!(saved.synced);
    assert_eq!(saved.cloud_id.as_deref(), Some("c"));
    assert_eq!(saved.score, 1.0);
}

#[tokio::test]
async fn test_resave_keeps_acknowledged_cloud_id() {
    let store = memory_store(1000);
    store.save(record("a", 1).with_id("x")).await.unwrap();
    store.mark_synced("x", Some("cloud-1")).await.unwrap();

    let mut resaved = record("a", 1).with_id("x");
    resaved.cloud_id = Some("forged".to_string());
    store.save(resaved).await.unwrap();

    assert_eq!(store.get("x").await.unwrap().cloud_id.as_deref(), Some("cloud-1"));
}

#[tokio::test]
async fn test_new_record_cannot_claim_cloud_id() {
    let store = memory_store(1000);
    let mut claimed = record("a", 1).with_id("x");
    claimed.synced = true;
    claimed.cloud_id = Some("forged".to_string());
    store.save(claimed).await.unwrap();

    let saved = store.get("x").await.unwrap();
    assert!(!saved.synced);
    assert!(saved.cloud_id.is_none());
}

#[tokio::test]
async fn test_mark_many_synced_skips_unknown() {
    let store = memory_store(1000);
    store.save(record("a", 1).with_id("x")).await.unwrap();
    store.save(record("a", 2).with_id("y")).await.unwrap();

    let marks = vec![
        SyncMark::with_cloud_id("x", "cx"),
        SyncMark::with_cloud_id("nope", "cn"),
        SyncMark::new("y"),
    ];
    assert_eq!(store.mark_many_synced(&marks).await.unwrap(), 2);
    assert!(store.unsynced().await.is_empty());
}

#[tokio::test]
async fn test_mark_many_synced_counts_distinct_records() {
    let store = memory_store(1000);
    store.save(record("a", 1).with_id("x")).await.unwrap();

    let marks = vec![SyncMark::new("x"), SyncMark::new("x"), SyncMark::new("x")];
    assert_eq!(store.mark_many_synced(&marks).await.unwrap(), 1);
    assert!(store.unsynced().await.is_empty());
}

#[tokio::test]
async fn test_delete() {
    let store = memory_store(1000);
    store.save(record("a", 1).with_id("x")).await.unwrap();

    assert!(store.delete("x").await.unwrap());
    assert!(!store.delete("x").await.unwrap());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_lifecycle_scenario() {
    let store = memory_store(1000);
    let a = store.save(record("stroop", 10)).await.unwrap();
    let b = store.save(record("audio", 5)).await.unwrap();

    let ids: Vec<String> = store
        .list(&RecordFilter::default())
        .await
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec![b.clone(), a.clone()]);

    store.mark_synced(&a, Some("cloud-1")).await.unwrap();
    let unsynced: Vec<String> = store.unsynced().await.into_iter().map(|r| r.id).collect();
    assert_eq!(unsynced, vec![b]);

    assert_eq!(store.clean_older_than(0).await.unwrap(), 2);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_clean_older_than_keeps_recent() {
    let store = memory_store(1000);
    store.save(record_days_ago("a", 100).with_id("old")).await.unwrap();
    store.save(record_days_ago("a", 10).with_id("recent")).await.unwrap();

    assert_eq!(store.clean_older_than(90).await.unwrap(), 1);
    assert!(store.get("recent").await.is_some());
    assert_eq!(store.clean_older_than(90).await.unwrap(), 0);
}

#[tokio::test]
async fn test_export_import_round_trip() {
    let source = memory_store(1000);
    for i in 0..5 {
        source.save(record("stroop", i)).await.unwrap();
    }
    let exported = source.export().await;

    let target = memory_store(1000);
    let summary = target.import(exported.clone()).await.unwrap();
    assert_eq!(summary.imported, 5);
    assert_eq!(summary.total, 5);
    assert_eq!(target.export().await, exported);
}

#[tokio::test]
async fn test_import_never_overwrites() {
    let store = memory_store(1000);
    store.save(record("a", 1).with_id("x")).await.unwrap();
    let before = store.get("x").await.unwrap();

    let summary = store
        .import(vec![
            record("b", 2).with_id("x").with_score(0.0, 0.0),
            record("c", 3).with_id("fresh"),
            record("c", 3).with_id("fresh"),
        ])
        .await
        .unwrap();

    assert_eq!(summary.imported, 1);
    assert_eq!(summary.total, 2);
    assert_eq!(store.get("x").await.unwrap(), before);
}

#[tokio::test]
async fn test_concurrent_saves_lose_nothing() {
    let store = Arc::new(memory_store(1000));
    let mut handles = Vec::new();
    for i in 0..20 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.save(record("audio", i)).await.unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(store.len().await, 20);
}

#[tokio::test]
async fn test_native_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();

    {
        let backend = Arc::new(PreferencesStore::open(dir.path(), None).await.unwrap());
        let store = store_on(backend, 1000);
        store.save(record("stroop", 1).with_id("persisted")).await.unwrap();
    }

    let backend = Arc::new(PreferencesStore::open(dir.path(), None).await.unwrap());
    let store = store_on(backend, 1000);
    let saved = store.get("persisted").await.unwrap();
    assert_eq!(saved.module_name, "stroop");
}

#[tokio::test]
async fn test_quota_recovery_evicts_old_and_retries() {
    let store = store_on(Arc::new(CappedDevice::new(3)), 1000);
    store.save(record_days_ago("a", 45).with_id("old-1")).await.unwrap();
    store.save(record_days_ago("a", 40).with_id("old-2")).await.unwrap();
    store.save(record("a", 5).with_id("recent")).await.unwrap();

    store.save(record("a", 1).with_id("newest")).await.unwrap();

    let ids: Vec<String> = store.export().await.into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["newest", "recent"]);

    // Persisted state matches the in-memory view
    store.reload().await;
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn test_quota_recovery_never_evicts_the_saved_record() {
    let store = store_on(Arc::new(CappedDevice::new(1)), 1000);
    store.save(record("a", 5).with_id("recent")).await.unwrap();

    let err = store
        .save(record_days_ago("a", 45).with_id("backfill"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::StorageFull { reclaimed_days: 30, .. }));

    let ids: Vec<String> = store.export().await.into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["recent"]);
    store.reload().await;
    assert!(store.get("backfill").await.is_none());
}

#[tokio::test]
async fn test_quota_without_old_records_is_storage_full() {
    let store = store_on(Arc::new(CappedDevice::new(1)), 1000);
    store.save(record("a", 5).with_id("kept")).await.unwrap();

    let err = store.save(record("a", 1).with_id("rejected")).await.unwrap_err();
    match err {
        StoreError::StorageFull { key, reclaimed_days } => {
            assert_eq!(key, format!("{}training_records", NAMESPACE));
            assert_eq!(reclaimed_days, 30);
        }
        other => panic!("expected StorageFull, got {:?}", other),
    }

    let ids: Vec<String> = store.export().await.into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["kept"]);
}

#[tokio::test]
async fn test_corrupt_entries_are_skipped() {
    let backend = memory_backend();
    let kv = neuroflex_store::backend::KvStore::new(backend.clone(), NAMESPACE);
    let good = record("a", 1).with_id("good");
    kv.set(
        "training_records",
        &serde_json::json!([serde_json::to_value(&good).unwrap(), {"bogus": true}]),
    )
    .await
    .unwrap();

    let store = store_on(backend, 1000);
    let records = store.export().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "good");
}

#[quickcheck]
fn prop_size_never_exceeds_cap(cap: u8, ages: Vec<u16>) -> bool {
    let cap = usize::from(cap % 16) + 1;
    tokio_test::block_on(async {
        let store = memory_store(cap);
        for age in &ages {
            store.save(record("prop", i64::from(*age))).await.unwrap();
            if store.len().await > cap {
                return false;
            }
        }

        let kept: Vec<TrainingRecord> = store.export().await;
        kept.len() == ages.len().min(cap)
            && kept
                .windows(2)
                .all(|w| w[0].completed_at >= w[1].completed_at)
    })
}
