//! Training record data model
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One completed training session result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingRecord {
    /// Unique within a store; empty means "assign one on save"
    #[serde(default)]
    pub id: String,
    /// Training module that produced the record (e.g. "stroop")
    pub module_name: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub score: f64,
    /// Percentage, 0–100
    #[serde(default)]
    pub accuracy: f64,
    /// Session length in milliseconds
    #[serde(default)]
    pub duration: u64,
    pub completed_at: DateTime<Utc>,
    /// Module-specific payload, never inspected by the store
    #[serde(default)]
    pub details: serde_json::Value,
    #[serde(default)]
    pub synced: bool,
    #[serde(default)]
    pub synced_at: Option<DateTime<Utc>>,
    /// Remote identifier, set only from a remote acknowledgment
    #[serde(default)]
    pub cloud_id: Option<String>,
    /// When this record was last written locally
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_local: bool,
}

impl TrainingRecord {
    /// Create a new, unsaved record
    pub fn new(module_name: impl Into<String>, completed_at: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            module_name: module_name.into(),
            difficulty: String::new(),
            score: 0.0,
            accuracy: 0.0,
            duration: 0,
            completed_at,
            details: serde_json::Value::Null,
            synced: false,
            synced_at: None,
            cloud_id: None,
            saved_at: None,
            is_local: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_difficulty(mut self, difficulty: impl Into<String>) -> Self {
        self.difficulty = difficulty.into();
        self
    }

    /// Set score and accuracy (clamped to 0–100)
    pub fn with_score(mut self, score: f64, accuracy: f64) -> Self {
        self.score = score;
        self.accuracy = accuracy.clamp(0.0, 100.0);
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration = duration_ms;
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    /// Record the remote acknowledgment. `synced` never goes back to false.
    pub(crate) fn apply_sync(&mut self, cloud_id: Option<&str>, now: DateTime<Utc>) -> bool {
        let mut changed = false;
        if !self.synced {
            self.synced = true;
            self.synced_at = Some(now);
            changed = true;
        }
        if let Some(cloud_id) = cloud_id {
            if self.cloud_id.as_deref() != Some(cloud_id) {
                self.cloud_id = Some(cloud_id.to_string());
                changed = true;
            }
        }
        changed
    }
}

/// Generate a local record identifier: `local_<unix millis>_<9 base36 chars>`
pub fn generate_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("local_{}_{}", Utc::now().timestamp_millis(), suffix)
}

/// Query options for listing records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    /// Exact module match
    pub module_name: Option<String>,
    /// Exact sync-state match
    pub synced: Option<bool>,
    /// Inclusive lower bound on `completed_at`
    pub start_date: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `completed_at`
    pub end_date: Option<DateTime<Utc>>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn module(mut self, module_name: impl Into<String>) -> Self {
        self.module_name = Some(module_name.into());
        self
    }

    pub fn synced(mut self, synced: bool) -> Self {
        self.synced = Some(synced);
        self
    }

    pub fn since(mut self, start: DateTime<Utc>) -> Self {
        self.start_date = Some(start);
        self
    }

    pub fn until(mut self, end: DateTime<Utc>) -> Self {
        self.end_date = Some(end);
        self
    }

    pub fn matches(&self, record: &TrainingRecord) -> bool {
        if let Some(module) = &self.module_name {
            if &record.module_name != module {
                return false;
            }
        }
        if let Some(synced) = self.synced {
            if record.synced != synced {
                return false;
            }
        }
        if let Some(start) = self.start_date {
            if record.completed_at < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if record.completed_at >= end {
                return false;
            }
        }
        true
    }
}

/// Pairing of a local record with its remote acknowledgment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncMark {
    pub id: String,
    pub cloud_id: Option<String>,
}

impl SyncMark {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cloud_id: None,
        }
    }

    pub fn with_cloud_id(id: impl Into<String>, cloud_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cloud_id: Some(cloud_id.into()),
        }
    }
}

/// Outcome of merging external records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Records newly added and kept after retention
    pub imported: usize,
    /// Collection size after the merge
    pub total: usize,
}
