//! Error types for the NeuroFlex record store
//!
//! Storage, sync and configuration failures share one error enum so callers
//! can match on the condition instead of inspecting messages.

use thiserror::Error;

/// Main error type for storage and synchronization
#[derive(Error, Debug)]
pub enum StoreError {
    /// The selected backend failed its write/read/remove probe
    #[error("Storage backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A write exceeded the device storage allotment
    #[error("Storage quota exceeded while writing '{key}'")]
    QuotaExceeded { key: String },

    /// Quota recovery ran and the retried write still did not fit
    #[error("Storage is full: '{key}' could not be written after reclaiming records older than {reclaimed_days} days")]
    StorageFull { key: String, reclaimed_days: u32 },

    /// Any other backend failure
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Sync attempted without an active session
    #[error("Not logged in: an active session is required to sync")]
    NotAuthenticated,

    /// The remote collaborator rejected or failed the batch
    #[error("Sync failed: {0}")]
    SyncFailure(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Import document was not in the expected shape
    #[error("Invalid import data: {0}")]
    InvalidImport(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StoreError {
    /// True for the device quota condition produced by a backend write
    pub fn is_quota(&self) -> bool {
        matches!(self, StoreError::QuotaExceeded { .. })
    }
}

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
