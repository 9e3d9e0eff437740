// Usage and statistics views derived from the record store.
//
// Nothing here mutates the store.

pub mod aggregator;

pub use aggregator::{
    compute_stats, format_bytes, training_summary, ModuleStats, StatsAggregator, StorageStats,
    StorageUsage, TrainingSummary,
};
