//! Cloud synchronization
//!
//! Uploads unsynced local records to the remote service in one batch and
//! records the acknowledgments. Batches are all-or-nothing: either every
//! record is marked synced with its remote id, or none is.
//!
//! Components:
//! - `orchestrator`: the sync pass itself
//! - `session`: in-process auth session state
//! - `http`: REST implementation of the remote collaborator

pub mod http;
pub mod orchestrator;
pub mod session;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::records::TrainingRecord;

pub use http::HttpRemote;
pub use orchestrator::{SyncOrchestrator, SyncReport};
pub use session::SessionState;

/// Auth boundary consumed by sync
pub trait AuthSession: Send + Sync {
    fn is_active(&self) -> bool;

    fn user_id(&self) -> Option<String>;
}

/// Remote collaborator accepting record batches.
///
/// Returns one remote id per submitted record, in submission order, or a
/// single batch-level failure.
#[async_trait]
pub trait RemoteSink: Send + Sync {
    async fn upload_batch(&self, user_id: &str, batch: &[RecordPayload]) -> Result<Vec<String>>;
}

/// Record as sent to the remote service: everything except local-only fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPayload {
    pub id: String,
    pub module_name: String,
    pub difficulty: String,
    pub score: f64,
    pub accuracy: f64,
    pub duration: u64,
    pub completed_at: DateTime<Utc>,
    pub details: serde_json::Value,
    pub synced: bool,
    pub synced_at: Option<DateTime<Utc>>,
    pub cloud_id: Option<String>,
}

impl From<&TrainingRecord> for RecordPayload {
    fn from(record: &TrainingRecord) -> Self {
        Self {
            id: record.id.clone(),
            module_name: record.module_name.clone(),
            difficulty: record.difficulty.clone(),
            score: record.score,
            accuracy: record.accuracy,
            duration: record.duration,
            completed_at: record.completed_at,
            details: record.details.clone(),
            synced: record.synced,
            synced_at: record.synced_at,
            cloud_id: record.cloud_id.clone(),
        }
    }
}
