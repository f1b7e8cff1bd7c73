//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the aggregator.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the aggregator.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KoblingConfig {
    /// Upstream servers whose routers are aggregated.
    pub servers: Vec<ServerConfig>,

    /// Poll interval in seconds.
    pub run_every: u64,

    /// Namespace root of every published key.
    pub root_key: String,

    /// Global default for middleware forwarding.
    pub forward_middlewares: Option<bool>,

    /// Global default for service forwarding.
    pub forward_services: Option<bool>,

    /// Upstream API client settings.
    pub upstream: UpstreamConfig,

    /// Destination the snapshot is published to.
    pub exporter: Option<ExporterConfig>,

    /// Baseline adoption policy.
    pub reconcile: ReconcileConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for KoblingConfig {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            run_every: 60,
            root_key: "traefik".to_string(),
            forward_middlewares: None,
            forward_services: None,
            upstream: UpstreamConfig::default(),
            exporter: None,
            reconcile: ReconcileConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl KoblingConfig {
    /// Whether middlewares are forwarded for `server`.
    ///
    /// Server override, else global default, else `false`.
    pub fn forwards_middlewares(&self, server: &ServerConfig) -> bool {
        server
            .forward_middlewares
            .or(self.forward_middlewares)
            .unwrap_or(false)
    }

    /// Whether services are forwarded for `server`.
    pub fn forwards_services(&self, server: &ServerConfig) -> bool {
        server
            .forward_services
            .or(self.forward_services)
            .unwrap_or(false)
    }
}

/// One upstream proxy instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Unique identifier, used as namespace segment and collision suffix.
    pub name: String,

    /// Base URL of the upstream API. May embed `user:password@`.
    pub api_address: String,

    /// Optional `Host` header sent to the upstream API.
    #[serde(default)]
    pub api_host: Option<String>,

    /// URL this server's traffic is forwarded to.
    pub destination_address: String,

    /// Global entry point name -> local entry point name.
    #[serde(default = "default_entry_points")]
    pub entry_points: BTreeMap<String, String>,

    #[serde(default)]
    pub forward_middlewares: Option<bool>,

    #[serde(default)]
    pub forward_services: Option<bool>,
}

fn default_entry_points() -> BTreeMap<String, String> {
    BTreeMap::from([("web".to_string(), "web".to_string())])
}

/// Upstream API client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

/// Destination selection.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExporterConfig {
    /// Redis key-value store.
    Redis { url: String },

    /// Single YAML dynamic configuration file.
    File {
        path: String,
        #[serde(default = "default_indent")]
        indent: usize,
    },
}

fn default_indent() -> usize {
    4
}

/// When the reconciler adopts a freshly built snapshot as its baseline.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BaselinePolicy {
    /// Only after the exporter confirmed the write.
    #[default]
    OnSuccess,
    /// Every cycle, regardless of the export result.
    Always,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ReconcileConfig {
    pub baseline: BaselinePolicy,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
