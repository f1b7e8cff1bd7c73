//! Startup orchestration.
//!
//! # Responsibilities
//! - Select the exporter from configuration, exactly once
//! - Build upstream clients and the worker
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and polling never begins
//! - A Redis connection is established before the first cycle

use thiserror::Error;

use crate::config::{ExporterConfig, KoblingConfig};
use crate::export::{Exporter, FileExporter, KeyValueExporter, RedisStore, StoreError};
use crate::upstream::UpstreamError;
use crate::worker::Worker;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("no exporter configured")]
    MissingExporter,

    #[error("cannot reach destination store: {0}")]
    Store(#[from] StoreError),

    #[error("cannot create upstream client: {0}")]
    Upstream(#[from] UpstreamError),
}

/// Create the exporter named by `config.exporter`.
pub async fn build_exporter(config: &KoblingConfig) -> Result<Box<dyn Exporter>, StartupError> {
    match config.exporter.as_ref().ok_or(StartupError::MissingExporter)? {
        ExporterConfig::Redis { url } => {
            let store = RedisStore::connect(url).await?;
            tracing::info!("Exporting configuration to redis");
            Ok(Box::new(KeyValueExporter::new(store, config.root_key.clone())))
        }
        ExporterConfig::File { path, indent } => {
            tracing::info!(file = %path, "Exporting configuration to file");
            Ok(Box::new(FileExporter::new(path, config.root_key.clone(), *indent)))
        }
    }
}

/// Wire the worker for a validated configuration.
pub async fn build_worker(config: &KoblingConfig) -> Result<Worker, StartupError> {
    let exporter = build_exporter(config).await?;
    let worker = Worker::new(config, exporter)?;

    for server in &config.servers {
        tracing::info!(
            server = %server.name,
            destination = %server.destination_address,
            entry_points = server.entry_points.len(),
            forward_middlewares = config.forwards_middlewares(server),
            forward_services = config.forwards_services(server),
            "Server configured"
        );
    }

    Ok(worker)
}
