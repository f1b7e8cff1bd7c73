//! Records returned by the upstream proxy API.
//!
//! Only the fields the entry builder consumes are modelled; everything else in
//! the payload is ignored. Missing arrays decode as empty.

use serde::Deserialize;
use thiserror::Error;

/// Router protocol families exposed by the upstream API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Http,
    Tcp,
}

impl Protocol {
    pub const ALL: [Protocol; 2] = [Protocol::Http, Protocol::Tcp];

    /// Key segment and log label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Tcp => "tcp",
        }
    }

    pub fn routers_endpoint(&self) -> &'static str {
        match self {
            Protocol::Http => "api/http/routers",
            Protocol::Tcp => "api/tcp/routers",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const MIDDLEWARES_ENDPOINT: &str = "api/http/middlewares";
pub const SERVICES_ENDPOINT: &str = "api/http/services";

/// A router as reported by `api/{protocol}/routers`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct RouterRecord {
    /// Provider-qualified name, e.g. `whoami@docker`.
    pub name: String,
    pub rule: String,
    pub service: String,
    pub entry_points: Vec<String>,
    pub middlewares: Vec<String>,
    pub priority: i64,
}

/// A middleware as reported by `api/http/middlewares`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct MiddlewareRecord {
    pub name: String,
    pub status: String,
    pub used_by: Vec<String>,
    pub provider: String,
}

/// A service as reported by `api/http/services`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceRecord {
    pub name: String,
}

/// Failure talking to one upstream endpoint.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The configured API address cannot be used.
    #[error("server '{server}': invalid api address: {reason}")]
    InvalidAddress { server: String, reason: String },

    /// HTTP client construction failed.
    #[error("server '{server}': failed to build http client: {source}")]
    Client {
        server: String,
        #[source]
        source: reqwest::Error,
    },

    /// Connection, timeout or body transfer failure.
    #[error("server '{server}' unreachable at {endpoint}: {source}")]
    Unreachable {
        server: String,
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status.
    #[error("server '{server}' returned {status} for {endpoint}")]
    Status {
        server: String,
        endpoint: &'static str,
        status: reqwest::StatusCode,
    },

    /// Body is not the expected JSON array.
    #[error("server '{server}' returned malformed {endpoint}: {source}")]
    Malformed {
        server: String,
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl UpstreamError {
    /// Server the failed call was made for.
    pub fn server(&self) -> &str {
        match self {
            UpstreamError::InvalidAddress { server, .. }
            | UpstreamError::Client { server, .. }
            | UpstreamError::Unreachable { server, .. }
            | UpstreamError::Status { server, .. }
            | UpstreamError::Malformed { server, .. } => server,
        }
    }

    /// Endpoint label for metrics, `"client"` for setup failures.
    pub fn endpoint(&self) -> &'static str {
        match self {
            UpstreamError::Unreachable { endpoint, .. }
            | UpstreamError::Status { endpoint, .. }
            | UpstreamError::Malformed { endpoint, .. } => endpoint,
            UpstreamError::InvalidAddress { .. } | UpstreamError::Client { .. } => "client",
        }
    }
}
