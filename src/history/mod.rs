//! Price history persistence
//!
//! SQLite store for observations, deals, and the daily/monthly aggregate
//! tiers, plus the retention compaction that keeps the detail tables
//! bounded. The store is the only shared mutable state in the process.
//!
//! - `store` - connection handling, schema, reads and writes
//! - `retention` - compact-and-prune over the two retention tiers

pub mod retention;
pub mod store;

// Re-export commonly used types
pub use retention::CompactionReport;
pub use store::{PriceHistoryStore, StoreError};
