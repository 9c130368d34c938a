// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod analyze;
pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod record;
pub mod scheduler;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::{Aggregator, RawSourceResult, RunSummary};
pub use crate::api::{create_router, AppState};
pub use crate::config::AppConfig;
pub use crate::error::{Error, Result};
pub use crate::record::{AggregatedRecord, LatestRecord, StoredRecord};
pub use crate::scheduler::{JobInfo, ScheduledJob, Trigger};
pub use crate::store::{RecordStore, SqliteStore};
