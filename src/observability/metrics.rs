//! Metrics collection and exposition.
//!
//! # Metrics
//! - `kobling_cycles_total` (counter): completed poll cycles
//! - `kobling_upstream_failures_total` (counter): failed fetches by server, endpoint
//! - `kobling_published_keys` (gauge): keys in the last built snapshot
//! - `kobling_keys_written_total` / `kobling_keys_deleted_total` (counters)
//! - `kobling_export_failures_total` (counter): by exporter
//! - `kobling_cycle_duration_seconds` (histogram)
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_cycle(duration: Duration) {
    counter!("kobling_cycles_total").increment(1);
    histogram!("kobling_cycle_duration_seconds").record(duration.as_secs_f64());
}

pub fn record_upstream_failure(server: &str, endpoint: &str) {
    counter!(
        "kobling_upstream_failures_total",
        "server" => server.to_string(),
        "endpoint" => endpoint.to_string()
    )
    .increment(1);
}

pub fn record_snapshot_size(keys: usize) {
    gauge!("kobling_published_keys").set(keys as f64);
}

pub fn record_export(written: usize, deleted: usize) {
    counter!("kobling_keys_written_total").increment(written as u64);
    counter!("kobling_keys_deleted_total").increment(deleted as u64);
}

pub fn record_export_failure(exporter: &'static str) {
    counter!("kobling_export_failures_total", "exporter" => exporter).increment(1);
}
