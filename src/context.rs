//! Composition root
//!
//! Builds one instance of every storage component over a single backend and
//! hands out shared references. Nothing in the crate reaches for a global;
//! callers own a [`StorageContext`] and pass it around.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::backend::{select_backend, BackendKind, KvStore, StorageBackend};
use crate::backup::DataExport;
use crate::config::StoreConfig;
use crate::debounce::Debouncer;
use crate::errors::{Result, StoreError};
use crate::profile::{UserDataStore, UserPreferences};
use crate::records::{ImportSummary, RecordStore, RetentionPolicy};
use crate::stats::StatsAggregator;
use crate::sync::{AuthSession, RemoteSink, SyncOrchestrator};

pub struct StorageContext {
    kv: KvStore,
    records: Arc<RecordStore>,
    user_data: Arc<UserDataStore>,
    stats: StatsAggregator,
    available: bool,
    debounce: Duration,
}

impl StorageContext {
    /// Validate `config`, pick a backend and wire everything to it
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        let backend = select_backend(config).await?;
        Ok(Self::with_backend(backend, config).await)
    }

    /// Wire the components over an already-chosen backend
    pub async fn with_backend(backend: Arc<dyn StorageBackend>, config: &StoreConfig) -> Self {
        let kv = KvStore::new(backend, config.storage.namespace.clone());
        let available = kv.probe().await;
        if !available {
            warn!(kind = ?kv.backend_kind(), "storage probe failed; cloud actions disabled");
        }

        let records = Arc::new(RecordStore::new(
            kv.clone(),
            RetentionPolicy::from(&config.storage),
        ));
        let user_data = Arc::new(UserDataStore::new(kv.clone(), records.clone()));
        let stats = StatsAggregator::new(records.clone(), kv.clone());

        info!(kind = ?kv.backend_kind(), namespace = kv.namespace(), "storage ready");
        Self {
            kv,
            records,
            user_data,
            stats,
            available,
            debounce: Duration::from_millis(config.storage.debounce_ms),
        }
    }

    pub fn kv(&self) -> &KvStore {
        &self.kv
    }

    pub fn records(&self) -> Arc<RecordStore> {
        self.records.clone()
    }

    pub fn user_data(&self) -> Arc<UserDataStore> {
        self.user_data.clone()
    }

    pub fn stats(&self) -> &StatsAggregator {
        &self.stats
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.kv.backend_kind()
    }

    /// Whether the startup probe succeeded
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Sync is refused when storage failed its probe; local play is not
    pub fn orchestrator(
        &self,
        auth: Arc<dyn AuthSession>,
        remote: Arc<dyn RemoteSink>,
    ) -> Result<SyncOrchestrator> {
        if !self.available {
            return Err(StoreError::BackendUnavailable(format!(
                "{:?} storage failed its probe",
                self.backend_kind()
            )));
        }
        Ok(SyncOrchestrator::new(self.records.clone(), auth, remote))
    }

    /// Debounced writer for preference changes
    pub fn preferences_writer(&self) -> Debouncer<UserPreferences> {
        let user_data = self.user_data.clone();
        Debouncer::spawn(self.debounce, move |prefs: UserPreferences| {
            let user_data = user_data.clone();
            async move { user_data.save_preferences(&prefs).await }
        })
    }

    pub async fn export_json(&self) -> Result<String> {
        let records = self.records.export().await;
        let stats = crate::stats::compute_stats(&records);
        DataExport::new(records)
            .with_settings(self.user_data.settings().await)
            .with_stats(stats)
            .to_json()
    }

    /// Merge the records of a backup document; other sections are ignored
    pub async fn import_json(&self, text: &str) -> Result<ImportSummary> {
        let export = DataExport::from_json(text)?;
        self.records.import(export.training_records).await
    }

    /// Remove every namespaced key. Returns how many were removed.
    pub async fn clear_all(&self) -> Result<usize> {
        let removed = self.kv.clear().await?;
        self.records.reload().await;
        info!(removed, "cleared local data");
        Ok(removed)
    }
}
