// Statistics views over the persisted record collection
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::backend::KvStore;
use crate::errors::Result;
use crate::records::{RecordStore, TrainingRecord};

/// Per-module sync breakdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleStats {
    pub total: usize,
    pub synced: usize,
    pub unsynced: usize,
}

/// Snapshot of the local collection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub total_records: usize,
    pub synced_records: usize,
    pub unsynced_records: usize,
    /// Length of the serialized collection
    pub estimated_size: usize,
    pub module_stats: BTreeMap<String, ModuleStats>,
    /// Most recent `completed_at`
    pub last_record: Option<DateTime<Utc>>,
}

/// Training totals shown on the profile screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingSummary {
    pub sessions: usize,
    /// Sum of session durations in milliseconds
    pub total_duration_ms: u64,
    /// Mean score rounded to the nearest integer
    pub average_score: i64,
}

/// Namespaced storage footprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageUsage {
    pub total_size: u64,
    pub item_count: usize,
    pub formatted_size: String,
}

/// Read-only statistics over a [`RecordStore`]
pub struct StatsAggregator {
    records: Arc<RecordStore>,
    kv: KvStore,
}

impl StatsAggregator {
    pub fn new(records: Arc<RecordStore>, kv: KvStore) -> Self {
        Self { records, kv }
    }

    pub async fn compute_stats(&self) -> StorageStats {
        let records = self.records.export().await;
        compute_stats(&records)
    }

    pub async fn training_summary(&self) -> TrainingSummary {
        let records = self.records.export().await;
        training_summary(&records)
    }

    pub async fn storage_usage(&self) -> Result<StorageUsage> {
        let usage = self.kv.usage().await?;
        Ok(StorageUsage {
            total_size: usage.total_size,
            item_count: usage.item_count,
            formatted_size: format_bytes(usage.total_size),
        })
    }
}

/// Derive [`StorageStats`] from a collection
pub fn compute_stats(records: &[TrainingRecord]) -> StorageStats {
    let mut stats = StorageStats {
        total_records: records.len(),
        estimated_size: serde_json::to_string(records).map(|s| s.len()).unwrap_or(0),
        ..Default::default()
    };

    for record in records {
        let module = stats
            .module_stats
            .entry(record.module_name.clone())
            .or_default();
        module.total += 1;
        if record.synced {
            module.synced += 1;
            stats.synced_records += 1;
        } else {
            module.unsynced += 1;
            stats.unsynced_records += 1;
        }
    }

    stats.last_record = records.iter().map(|r| r.completed_at).max();
    stats
}

pub fn training_summary(records: &[TrainingRecord]) -> TrainingSummary {
    if records.is_empty() {
        return TrainingSummary::default();
    }

    let total_score: f64 = records.iter().map(|r| r.score).sum();
    TrainingSummary {
        sessions: records.len(),
        total_duration_ms: records.iter().map(|r| r.duration).sum(),
        average_score: (total_score / records.len() as f64).round() as i64,
    }
}

/// Human-readable byte count, 1024 base
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}
