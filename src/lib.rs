//! Traefik Kobling Library
//!
//! Aggregates the routers of several upstream Traefik instances and
//! republishes them, namespaced per server, into one downstream
//! configuration store (Redis or a dynamic configuration file).

pub mod config;
pub mod entries;
pub mod export;
pub mod lifecycle;
pub mod observability;
pub mod reconcile;
pub mod upstream;
pub mod worker;

pub use config::KoblingConfig;
pub use entries::Snapshot;
pub use lifecycle::Shutdown;
pub use worker::Worker;
