//! Browser-style key/value storage
//!
//! Mirrors localStorage: a flat string map with a per-origin byte
//! allotment. A write that would exceed the allotment is rejected and the
//! previous value is left in place. An optional snapshot file lets the map
//! survive restarts.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{io_error, BackendKind, StorageBackend};
use crate::errors::{Result, StoreError};

/// Typical browser allotment for one origin (5 MiB)
pub const DEFAULT_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

/// In-memory web storage with a byte quota
pub struct WebStorage {
    items: RwLock<HashMap<String, String>>,
    quota_bytes: u64,
    snapshot: Option<PathBuf>,
}

impl WebStorage {
    /// Create an empty, memory-only store
    pub fn new(quota_bytes: u64) -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
            quota_bytes,
            snapshot: None,
        }
    }

    /// Open a store backed by a snapshot file, loading it if present.
    ///
    /// An unreadable snapshot starts the store empty.
    pub async fn open(path: impl Into<PathBuf>, quota_bytes: u64) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(&path.to_string_lossy(), e))?;
        }

        let items = match tokio::fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "discarding corrupt web storage snapshot");
                HashMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(io_error(&path.to_string_lossy(), e)),
        };

        Ok(Self {
            items: RwLock::new(items),
            quota_bytes,
            snapshot: Some(path),
        })
    }

    /// Bytes currently charged against the quota
    pub async fn used_bytes(&self) -> u64 {
        let items = self.items.read().await;
        items.iter().map(|(k, v)| entry_cost(k, v)).sum()
    }

    pub fn quota_bytes(&self) -> u64 {
        self.quota_bytes
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }

    async fn write_snapshot(&self, items: &HashMap<String, String>) -> Result<()> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        let text = serde_json::to_string(items)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, text)
            .await
            .map_err(|e| io_error(&path.to_string_lossy(), e))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| io_error(&path.to_string_lossy(), e))?;
        Ok(())
    }
}

fn entry_cost(key: &str, value: &str) -> u64 {
    (key.len() + value.len()) as u64
}

#[async_trait]
impl StorageBackend for WebStorage {
    fn kind(&self) -> BackendKind {
        BackendKind::Web
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let items = self.items.read().await;
        Ok(items.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.write().await;

        let used: u64 = items
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| entry_cost(k, v))
            .sum();
        let needed = used + entry_cost(key, value);
        if needed > self.quota_bytes {
            debug!(key, needed, quota = self.quota_bytes, "web storage quota exceeded");
            return Err(StoreError::QuotaExceeded { key: key.to_string() });
        }

        if self.snapshot.is_some() {
            let mut next = items.clone();
            next.insert(key.to_string(), value.to_string());
            self.write_snapshot(&next).await?;
            *items = next;
        } else {
            items.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut items = self.items.write().await;
        if items.remove(key).is_some() {
            self.write_snapshot(&items).await?;
        }
        Ok(())
    }

    async fn list_keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let items = self.items.read().await;
        let mut keys: Vec<String> = items
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}
