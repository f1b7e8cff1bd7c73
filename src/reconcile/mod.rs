//! Snapshot reconciliation subsystem.
//!
//! # Data Flow
//! ```text
//! merged Snapshot (this cycle)
//!     → reconciler.rs (compare against baseline)
//!     → diff.rs (added / updated / removed keys)
//!     → exporter applies (baseline, new)
//!     → reconciler.rs settles: adopt new baseline per BaselinePolicy
//! ```
//!
//! # Design Decisions
//! - Baseline is owned by the worker; no global state
//! - Equality is full (key, value) set equality
//! - Default policy adopts only confirmed exports so failed writes are retried

pub mod diff;
pub mod reconciler;

pub use diff::Diff;
pub use reconciler::Reconciler;
