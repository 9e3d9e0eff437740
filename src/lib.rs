//! neuroflex-store v0.5.0 - Offline-first training record storage
//!
//! Persists per-session training results on the device, keeps them within a
//! retention cap, and uploads them to a remote service on demand.
//!
//! # Architecture
//!
//! - **backend**: async key/value trait over web and native device stores
//! - **records**: the authoritative record collection and its invariants
//! - **sync**: batch upload of unsynced records
//! - **stats**: read-only reporting over the collection
//! - **context**: wires one instance of each over a chosen backend

pub mod errors;
pub mod config;

// Storage layers
pub mod backend;
pub mod records;
pub mod profile;

// Remote synchronization
pub mod sync;

// Reporting and backup
pub mod stats;
pub mod backup;

pub mod debounce;
pub mod context;
pub mod cli;

// Re-export commonly used types
pub use context::StorageContext;
pub use errors::{Result, StoreError};
pub use records::{RecordFilter, RecordStore, TrainingRecord};
pub use sync::{AuthSession, RemoteSink, SyncOrchestrator, SyncReport};
