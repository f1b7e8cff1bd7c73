//! Poll loop.
//!
//! # Data Flow
//! ```text
//! Polling:
//!     for each server (sequentially, cancellable between and during fetches):
//!         upstream::client → entries::builder → fragment
//!     merge fragments → Snapshot
//!     reconcile::Reconciler::diff → export::Exporter::export → settle baseline
//! Sleeping:
//!     run_every seconds, cancellable
//! ```
//!
//! # Design Decisions
//! - A failing server or endpoint only empties its own fragment
//! - An in-flight export is never interrupted

use std::collections::HashSet;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

use crate::config::{KoblingConfig, ServerConfig};
use crate::entries::{EntryBuilder, ForwardPolicy, Inventory, Snapshot};
use crate::export::{ExportError, ExportOutcome, Exporter};
use crate::observability::metrics;
use crate::reconcile::Reconciler;
use crate::upstream::{Protocol, UpstreamClient, UpstreamError};

/// One configured server with its client and resolved forwarding flags.
#[derive(Debug, Clone)]
pub struct Upstream {
    pub config: ServerConfig,
    pub client: UpstreamClient,
    pub policy: ForwardPolicy,
}

/// What happened to the export step of a cycle.
#[derive(Debug)]
pub enum CycleExport {
    /// Snapshot matched the baseline.
    Skipped,
    Done(ExportOutcome),
    Failed(ExportError),
}

/// Summary of one completed cycle.
#[derive(Debug)]
pub struct CycleReport {
    /// Keys in the merged snapshot.
    pub keys: usize,
    /// Keys added, updated or removed relative to the baseline.
    pub changes: usize,
    /// Failed (server, endpoint) fetches.
    pub failures: usize,
    pub export: CycleExport,
    /// Whether the snapshot became the new baseline.
    pub adopted: bool,
}

/// Periodically republishes the merged configuration of all servers.
pub struct Worker {
    upstreams: Vec<Upstream>,
    builder: EntryBuilder,
    exporter: Box<dyn Exporter>,
    reconciler: Reconciler,
    interval: Duration,
}

impl Worker {
    /// Build clients for every configured server.
    pub fn new(config: &KoblingConfig, exporter: Box<dyn Exporter>) -> Result<Self, UpstreamError> {
        let timeout = Duration::from_secs(config.upstream.timeout_secs);
        let upstreams = config
            .servers
            .iter()
            .map(|server| {
                Ok(Upstream {
                    client: UpstreamClient::new(server, timeout)?,
                    policy: ForwardPolicy {
                        middlewares: config.forwards_middlewares(server),
                        services: config.forwards_services(server),
                    },
                    config: server.clone(),
                })
            })
            .collect::<Result<Vec<_>, UpstreamError>>()?;

        Ok(Self {
            upstreams,
            builder: EntryBuilder::new(config.root_key.clone()),
            exporter,
            reconciler: Reconciler::new(config.reconcile.baseline),
            interval: Duration::from_secs(config.run_every),
        })
    }

    /// Replace the baseline, e.g. with state published by a previous run.
    pub fn with_baseline(mut self, baseline: Snapshot) -> Self {
        self.reconciler = Reconciler::with_baseline(self.reconciler.policy(), baseline);
        self
    }

    pub fn baseline(&self) -> &Snapshot {
        self.reconciler.baseline()
    }

    /// Run cycles until `shutdown` fires.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            servers = self.upstreams.len(),
            exporter = self.exporter.name(),
            interval_secs = self.interval.as_secs(),
            "Worker starting"
        );

        loop {
            if self.run_cycle(&mut shutdown).await.is_none() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.recv() => break,
            }
        }

        tracing::info!("Worker received shutdown signal, exiting loop");
    }

    /// One Polling step. Returns `None` if cancelled before exporting.
    pub async fn run_cycle(&mut self, shutdown: &mut broadcast::Receiver<()>) -> Option<CycleReport> {
        let started = Instant::now();
        tracing::debug!("Cycle starting");

        let (snapshot, failures) = self.build_snapshot(shutdown).await?;

        let diff = self.reconciler.diff(&snapshot);
        let export = if diff.is_empty() {
            CycleExport::Skipped
        } else {
            match self.exporter.export(self.reconciler.baseline(), &snapshot).await {
                Ok(outcome) => CycleExport::Done(outcome),
                Err(e) => CycleExport::Failed(e),
            }
        };

        match &export {
            CycleExport::Skipped => tracing::debug!("No changes to publish"),
            CycleExport::Done(outcome) => {
                if let ExportOutcome::Applied { written, deleted } = outcome {
                    metrics::record_export(*written, *deleted);
                }
                tracing::info!(
                    added = diff.added.len(),
                    updated = diff.updated.len(),
                    removed = diff.removed.len(),
                    ?outcome,
                    "Published configuration"
                );
            }
            CycleExport::Failed(e) => {
                metrics::record_export_failure(self.exporter.name());
                tracing::error!(exporter = self.exporter.name(), error = %e, "Export failed");
            }
        }

        let keys = snapshot.len();
        let exported = !matches!(export, CycleExport::Failed(_));
        let adopted = self.reconciler.settle(snapshot, exported);

        metrics::record_snapshot_size(keys);
        metrics::record_cycle(started.elapsed());

        Some(CycleReport {
            keys,
            changes: diff.len(),
            failures,
            export,
            adopted,
        })
    }

    /// Fetch every server and merge the fragments.
    ///
    /// Returns `None` as soon as `shutdown` fires.
    pub async fn build_snapshot(
        &self,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Option<(Snapshot, usize)> {
        let mut snapshot = Snapshot::new();
        let mut failures = 0;

        for upstream in &self.upstreams {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!(server = %upstream.config.name, "Cycle cancelled");
                    return None;
                }
                (fragment, failed) = self.build_fragment(upstream) => {
                    tracing::debug!(
                        server = %upstream.config.name,
                        entries = fragment.len(),
                        failed,
                        "Server processed"
                    );
                    snapshot.extend(fragment);
                    failures += failed;
                }
            }
        }

        Some((snapshot, failures))
    }

    async fn build_fragment(&self, upstream: &Upstream) -> (Snapshot, usize) {
        let mut fragment = Snapshot::new();
        let mut failures = 0;

        for protocol in Protocol::ALL {
            let routers = match upstream.client.routers(protocol).await {
                Ok(routers) => routers,
                Err(e) => {
                    report_failure(&e);
                    failures += 1;
                    continue;
                }
            };

            if routers.is_empty() {
                tracing::info!(server = %upstream.config.name, %protocol, "No routers found");
                continue;
            }
            tracing::debug!(
                server = %upstream.config.name,
                %protocol,
                count = routers.len(),
                "Retrieved routers"
            );

            let mut inventory = Inventory {
                routers,
                ..Inventory::default()
            };
            if protocol == Protocol::Http {
                if upstream.policy.middlewares {
                    inventory.middlewares = match upstream.client.middlewares().await {
                        Ok(records) => records.into_iter().map(|m| m.name).collect(),
                        Err(e) => {
                            report_failure(&e);
                            failures += 1;
                            HashSet::new()
                        }
                    };
                }
                if upstream.policy.services {
                    inventory.services = match upstream.client.services().await {
                        Ok(records) => records.into_iter().map(|s| s.name).collect(),
                        Err(e) => {
                            report_failure(&e);
                            failures += 1;
                            HashSet::new()
                        }
                    };
                }
            }

            fragment.extend(self.builder.build(
                &upstream.config,
                protocol,
                &inventory,
                upstream.policy,
            ));
        }

        (fragment, failures)
    }
}

fn report_failure(error: &UpstreamError) {
    metrics::record_upstream_failure(error.server(), error.endpoint());
    tracing::error!(
        server = error.server(),
        endpoint = error.endpoint(),
        error = %error,
        "Could not fetch from upstream"
    );
}
