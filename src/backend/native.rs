//! Native app preference container
//!
//! Each key is stored as its own file under the container directory. Keys
//! are percent-encoded into file names so any key text is representable.
//! Writes go to a temp file first and are renamed into place.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use super::{io_error, BackendKind, StorageBackend};
use crate::errors::{Result, StoreError};

const VALUE_EXT: &str = "pref";

/// File-per-key preference store
pub struct PreferencesStore {
    dir: PathBuf,
    quota_bytes: Option<u64>,
    write_lock: Mutex<()>,
}

impl PreferencesStore {
    /// Open (and create if needed) the container directory
    pub async fn open(dir: impl Into<PathBuf>, quota_bytes: Option<u64>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error(&dir.to_string_lossy(), e))?;

        Ok(Self {
            dir,
            quota_bytes,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", encode_key(key), VALUE_EXT))
    }

    /// Bytes used by every stored value except `skip_key`
    async fn used_bytes_except(&self, skip_key: &str) -> Result<u64> {
        let skip = self.value_path(skip_key);
        let mut total = 0u64;
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| io_error(skip_key, e))?;

        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(skip_key, e))? {
            let path = entry.path();
            if path == skip || path.extension().and_then(|e| e.to_str()) != Some(VALUE_EXT) {
                continue;
            }
            if let Ok(meta) = entry.metadata().await {
                total += meta.len();
            }
        }
        Ok(total)
    }
}

#[async_trait]
impl StorageBackend for PreferencesStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.value_path(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(key, e)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if let Some(quota) = self.quota_bytes {
            let needed = self.used_bytes_except(key).await? + value.len() as u64;
            if needed > quota {
                debug!(key, needed, quota, "preference store quota exceeded");
                return Err(StoreError::QuotaExceeded { key: key.to_string() });
            }
        }

        let path = self.value_path(key);
        let tmp = path.with_extension(format!("{}.tmp", VALUE_EXT));
        if let Err(e) = tokio::fs::write(&tmp, value).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_error(key, e));
        }
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_error(key, e))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(self.value_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(key, e)),
        }
    }

    async fn list_keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| io_error(prefix, e))?;

        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(prefix, e))? {
            let name = entry.file_name();
            let Some(stem) = name
                .to_str()
                .and_then(|n| n.strip_suffix(&format!(".{}", VALUE_EXT)))
            else {
                continue;
            };
            if let Some(key) = decode_key(stem) {
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

/// Percent-encode everything outside `[A-Za-z0-9_-]`
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

fn decode_key(encoded: &str) -> Option<String> {
    let bytes = encoded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = encoded.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
