//! Export subsystem.
//!
//! # Data Flow
//! ```text
//! (baseline, new) Snapshot pair
//!     → Exporter selected once at startup:
//!         - kv.rs   (delete stale keys, compare-and-set changed keys)
//!                     → store.rs (Redis or in-memory)
//!         - file.rs (set-equal → no-op, else full rebuild)
//!                     → tree.rs (flat keys → nested document)
//!     → ExportOutcome or ExportError
//! ```
//!
//! # Design Decisions
//! - One trait method; the worker never knows which destination it feeds
//! - No cross-key atomicity; the next cycle repairs partial writes
//! - Single writer per destination is assumed

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::entries::Snapshot;

pub mod file;
pub mod kv;
pub mod store;
pub mod tree;

pub use file::FileExporter;
pub use kv::KeyValueExporter;
pub use store::{KeyValueStore, MemoryStore, RedisStore, StoreError};

/// Result of a successful export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Destination already matched.
    Unchanged,
    Applied { written: usize, deleted: usize },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("store {op} of '{key}' failed: {source}")]
    Store {
        op: &'static str,
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("writing {} failed: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A destination that can be moved from one snapshot to another.
#[async_trait]
pub trait Exporter: Send + Sync {
    /// Label for logs and metrics.
    fn name(&self) -> &'static str;

    /// Move the destination from `old` to `new`.
    async fn export(&self, old: &Snapshot, new: &Snapshot) -> Result<ExportOutcome, ExportError>;
}
