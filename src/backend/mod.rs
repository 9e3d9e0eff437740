//! Device-local storage backends
//!
//! A uniform async key/value interface over the two device stores the app
//! can run on. The concrete backend is chosen once by [`select_backend`];
//! everything above this module depends only on [`StorageBackend`].
//!
//! Components:
//! - `web`: browser-style key/value storage with a byte quota
//! - `native`: native preference container, one file per key
//! - `kv`: namespacing and JSON serialization shared by both backends

pub mod kv;
pub mod native;
pub mod web;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::StoreConfig;
use crate::errors::{Result, StoreError};

pub use crate::config::BackendKind;
pub use kv::{KvStore, KvUsage};
pub use native::PreferencesStore;
pub use web::WebStorage;

/// Sentinel key written by [`KvStore::probe`], before namespacing
pub const PROBE_KEY: &str = "__storage_probe__";
const PROBE_VALUE: &str = "probe";

/// Raw text key/value store.
///
/// Values are opaque text; serialization belongs to [`KvStore`]. A missing
/// key is `Ok(None)`, never an error. Writes that exhaust the device
/// allotment fail with [`StoreError::QuotaExceeded`].
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Which concrete store this is
    fn kind(&self) -> BackendKind;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;

    async fn list_keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    /// Write, read back and remove a sentinel value under `key`.
    ///
    /// `key` is a full backend key; callers pass a namespaced one.
    async fn probe(&self, key: &str) -> bool {
        if self.set(key, PROBE_VALUE).await.is_err() {
            return false;
        }
        let read_back = self.get(key).await;
        let removed = self.remove(key).await.is_ok();
        matches!(read_back, Ok(Some(ref v)) if v == PROBE_VALUE) && removed
    }
}

/// Pick the backend for this process. Runs once at startup.
pub async fn select_backend(config: &StoreConfig) -> Result<Arc<dyn StorageBackend>> {
    let data_dir = config.data_dir();
    let probe_key = probe_key(config);
    let quota = config.backend.quota_bytes;

    match config.backend.kind {
        BackendKind::Native => {
            let store = PreferencesStore::open(data_dir.join("preferences"), quota).await?;
            Ok(Arc::new(store))
        }
        BackendKind::Web => {
            let store = WebStorage::open(
                data_dir.join("web_storage.json"),
                quota.unwrap_or(web::DEFAULT_QUOTA_BYTES),
            )
            .await?;
            Ok(Arc::new(store))
        }
        BackendKind::Auto => {
            match PreferencesStore::open(data_dir.join("preferences"), quota).await {
                Ok(store) if store.probe(&probe_key).await => {
                    info!(dir = %store.dir().display(), "using native preference store");
                    return Ok(Arc::new(store));
                }
                Ok(store) => {
                    warn!(dir = %store.dir().display(), "native preference store failed probe");
                }
                Err(e) => {
                    warn!(error = %e, "native preference store unavailable");
                }
            }
            info!("falling back to in-memory web storage");
            Ok(Arc::new(WebStorage::new(
                quota.unwrap_or(web::DEFAULT_QUOTA_BYTES),
            )))
        }
    }
}

/// Namespaced sentinel key used while selecting a backend
fn probe_key(config: &StoreConfig) -> String {
    format!("{}{}", config.storage.namespace, PROBE_KEY)
}

/// Map a backend I/O failure onto the store taxonomy
pub(crate) fn io_error(key: &str, err: std::io::Error) -> StoreError {
    if is_storage_full(&err) {
        StoreError::QuotaExceeded { key: key.to_string() }
    } else {
        StoreError::Backend(format!("'{}': {}", key, err))
    }
}

fn is_storage_full(err: &std::io::Error) -> bool {
    const ENOSPC: i32 = 28;
    const ERROR_DISK_FULL: i32 = 112;

    match err.raw_os_error() {
        Some(code) if cfg!(windows) => code == ERROR_DISK_FULL,
        Some(code) => code == ENOSPC,
        None => false,
    }
}
