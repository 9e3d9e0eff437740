// Batch upload of unsynced records
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{AuthSession, RecordPayload, RemoteSink};
use crate::errors::{Result, StoreError};
use crate::records::{RecordStore, SyncMark, TrainingRecord};

/// Outcome of one sync pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Records acknowledged by the remote and marked synced
    pub synced: usize,
    /// Records submitted in the batch
    pub total: usize,
}

/// Reconciles the store's unsynced records with a remote collaborator
pub struct SyncOrchestrator {
    records: Arc<RecordStore>,
    auth: Arc<dyn AuthSession>,
    remote: Arc<dyn RemoteSink>,
    in_flight: Mutex<()>,
}

impl SyncOrchestrator {
    pub fn new(
        records: Arc<RecordStore>,
        auth: Arc<dyn AuthSession>,
        remote: Arc<dyn RemoteSink>,
    ) -> Self {
        Self {
            records,
            auth,
            remote,
            in_flight: Mutex::new(()),
        }
    }

    /// Records still waiting for upload
    pub async fn pending(&self) -> Vec<TrainingRecord> {
        self.records.unsynced().await
    }

    /// Upload every unsynced record in one batch.
    ///
    /// Overlapping calls are serialized; a caller that waited behind a
    /// successful pass finds nothing left to upload.
    pub async fn sync_all(&self) -> Result<SyncReport> {
        let user_id = match self.auth.user_id() {
            Some(id) if self.auth.is_active() => id,
            _ => return Err(StoreError::NotAuthenticated),
        };

        let _guard = self.in_flight.lock().await;

        let pending = self.records.unsynced().await;
        if pending.is_empty() {
            debug!("nothing to sync");
            return Ok(SyncReport::default());
        }

        let batch: Vec<RecordPayload> = pending.iter().map(RecordPayload::from).collect();
        let total = batch.len();
        debug!(count = total, "submitting sync batch");

        let remote_ids = match self.remote.upload_batch(&user_id, &batch).await {
            Ok(ids) => ids,
            Err(StoreError::NotAuthenticated) => return Err(StoreError::NotAuthenticated),
            Err(StoreError::SyncFailure(msg)) => {
                warn!(error = %msg, "sync batch rejected");
                return Err(StoreError::SyncFailure(msg));
            }
            Err(e) => {
                warn!(error = %e, "sync batch failed");
                return Err(StoreError::SyncFailure(e.to_string()));
            }
        };

        if remote_ids.len() != total {
            return Err(StoreError::SyncFailure(format!(
                "remote acknowledged {} of {} records",
                remote_ids.len(),
                total
            )));
        }

        let marks: Vec<SyncMark> = pending
            .iter()
            .zip(remote_ids)
            .map(|(record, cloud_id)| SyncMark::with_cloud_id(record.id.clone(), cloud_id))
            .collect();
        let synced = self.records.mark_many_synced(&marks).await?;

        info!(synced, total, "sync complete");
        Ok(SyncReport { synced, total })
    }
}
