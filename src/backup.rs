//! Versioned JSON backup document
//!
//! The export bundles the record collection with the user's settings and a
//! statistics snapshot. Import only consumes `trainingRecords`; the other
//! sections are informational.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, StoreError};
use crate::profile::UserSettings;
use crate::records::TrainingRecord;
use crate::stats::StorageStats;

pub const EXPORT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataExport {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub training_records: Vec<TrainingRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_settings: Option<UserSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<StorageStats>,
}

impl DataExport {
    pub fn new(training_records: Vec<TrainingRecord>) -> Self {
        Self {
            version: EXPORT_VERSION.to_string(),
            exported_at: Utc::now(),
            training_records,
            user_settings: None,
            stats: None,
        }
    }

    pub fn with_settings(mut self, settings: UserSettings) -> Self {
        self.user_settings = Some(settings);
        self
    }

    pub fn with_stats(mut self, stats: StorageStats) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a backup document. Only `trainingRecords` is required.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| StoreError::InvalidImport(format!("not valid JSON: {}", e)))?;

        match value.get("trainingRecords") {
            Some(serde_json::Value::Array(_)) => {}
            _ => {
                return Err(StoreError::InvalidImport(
                    "missing trainingRecords array".to_string(),
                ))
            }
        }

        let version = value
            .get("version")
            .and_then(|v| v.as_str())
            .unwrap_or(EXPORT_VERSION)
            .to_string();
        let exported_at = value
            .get("exportedAt")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_else(Utc::now);
        let training_records = serde_json::from_value(value["trainingRecords"].clone())
            .map_err(|e| StoreError::InvalidImport(format!("bad training record: {}", e)))?;
        let user_settings = value
            .get("userSettings")
            .and_then(|v| serde_json::from_value(v.clone()).ok());
        let stats = value
            .get("stats")
            .and_then(|v| serde_json::from_value(v.clone()).ok());

        Ok(Self {
            version,
            exported_at,
            training_records,
            user_settings,
            stats,
        })
    }
}
