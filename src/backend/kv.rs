//! Namespaced JSON layer over a [`StorageBackend`]
//!
//! Both backends share these serialization semantics: values are stored as
//! JSON text, and a missing or unparsable value reads as the caller's
//! default instead of failing.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{BackendKind, StorageBackend, PROBE_KEY};
use crate::errors::Result;

/// Raw usage figures for the namespaced keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KvUsage {
    pub total_size: u64,
    pub item_count: usize,
}

/// Typed, namespaced access to a backend
#[derive(Clone)]
pub struct KvStore {
    backend: Arc<dyn StorageBackend>,
    namespace: String,
}

impl KvStore {
    pub fn new(backend: Arc<dyn StorageBackend>, namespace: impl Into<String>) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Key as the backend sees it
    pub fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    /// Read a value, falling back to `default` when absent, corrupt or unreadable
    pub async fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get_opt(key).await.unwrap_or(default)
    }

    /// Read a value; `None` when absent, corrupt or unreadable
    pub async fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let full_key = self.full_key(key);
        let text = match self.backend.get(&full_key).await {
            Ok(Some(text)) => text,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %full_key, error = %e, "storage read failed, using default");
                return None;
            }
        };

        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %full_key, error = %e, "stored value is not valid JSON, using default");
                None
            }
        }
    }

    /// Serialize and write a value
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let full_key = self.full_key(key);
        let text = serde_json::to_string(value)?;
        debug!(key = %full_key, bytes = text.len(), "writing value");
        self.backend.set(&full_key, &text).await
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        self.backend.remove(&self.full_key(key)).await
    }

    /// Every backend key under this namespace
    pub async fn keys(&self) -> Result<Vec<String>> {
        self.backend.list_keys_with_prefix(&self.namespace).await
    }

    /// Remove every key under this namespace. Returns how many were removed.
    pub async fn clear(&self) -> Result<usize> {
        let keys = self.keys().await?;
        for key in &keys {
            self.backend.remove(key).await?;
        }
        debug!(namespace = %self.namespace, removed = keys.len(), "cleared namespace");
        Ok(keys.len())
    }

    /// Sum of stored text lengths under this namespace
    pub async fn usage(&self) -> Result<KvUsage> {
        let mut usage = KvUsage::default();
        for key in self.keys().await? {
            if let Some(value) = self.backend.get(&key).await? {
                usage.total_size += value.len() as u64;
                usage.item_count += 1;
            }
        }
        Ok(usage)
    }

    /// Probe the backend with a sentinel inside this namespace
    pub async fn probe(&self) -> bool {
        self.backend.probe(&self.full_key(PROBE_KEY)).await
    }
}
