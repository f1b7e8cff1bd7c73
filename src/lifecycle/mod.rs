//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Select exporter → Build upstream clients → Worker
//!
//! Shutdown (shutdown.rs):
//!     Trigger → broadcast → worker stops at its next await point
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then destination, then polling
//! - Cooperative shutdown: in-flight fetches and sleeps are interrupted,
//!   an in-flight export is allowed to finish

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
