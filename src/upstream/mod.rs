//! Upstream proxy API subsystem.
//!
//! # Data Flow
//! ```text
//! ServerConfig
//!     → client.rs (one reqwest client per server, auth + Host header)
//!     → GET api/{http,tcp}/routers, api/http/middlewares, api/http/services
//!     → types.rs (typed records) or UpstreamError
//! ```
//!
//! # Design Decisions
//! - Every failure is per (server, endpoint); callers decide how to degrade
//! - Non-2xx and undecodable bodies are errors, never partial data

pub mod client;
pub mod types;

pub use client::UpstreamClient;
pub use types::{MiddlewareRecord, Protocol, RouterRecord, ServiceRecord, UpstreamError};
