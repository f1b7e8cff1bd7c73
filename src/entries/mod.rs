//! Entry building subsystem.
//!
//! # Data Flow
//! ```text
//! (ServerConfig, Protocol, Inventory)
//!     → builder.rs (naming, entry point translation, forwarding)
//!     → keys.rs (key layout under the namespace root)
//!     → Snapshot fragment for that server
//!
//! Fragments of all servers
//!     → merged into one Snapshot per cycle
//! ```
//!
//! # Design Decisions
//! - Entries are plain `(String, String)` pairs; the value is opaque
//! - Snapshots are ordered maps so every consumer sees a stable key order

use std::collections::BTreeMap;

pub mod builder;
pub mod keys;

pub use builder::{EntryBuilder, ForwardPolicy, Inventory};

/// Full flat key/value state at one point in time.
pub type Snapshot = BTreeMap<String, String>;
