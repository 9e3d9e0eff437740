//! Training record storage
//!
//! - `model`: record, filter and sync acknowledgment types
//! - `store`: the persistent collection with retention and dedup
//! - `index`: in-memory id index backing the store

mod index;
pub mod model;
pub mod store;

pub use model::{generate_id, ImportSummary, RecordFilter, SyncMark, TrainingRecord};
pub use store::{RecordStore, RetentionPolicy, RECORDS_KEY};
