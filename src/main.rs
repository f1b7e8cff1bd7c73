//! Traefik Kobling
//!
//! Publishes the routers of several Traefik instances through one front door.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────┐   GET api/{http,tcp}/routers   ┌───────────────────────────────┐
//!   │ upstream #1  │◀───────────────────────────────│            worker             │
//!   ├──────────────┤                                │                               │
//!   │ upstream #2  │◀───────────────────────────────│  upstream → entries (build)   │
//!   ├──────────────┤                                │        → merged Snapshot      │
//!   │     ...      │◀───────────────────────────────│        → reconcile (diff)     │
//!   └──────────────┘                                │        → export               │
//!                                                   └───────────────┬───────────────┘
//!                                                                   │
//!                                        ┌──────────────────────────┴──────────┐
//!                                        ▼                                     ▼
//!                                 ┌─────────────┐                     ┌────────────────┐
//!                                 │    Redis    │                     │  dynamic.yml   │
//!                                 │ (kv export) │                     │ (file export)  │
//!                                 └──────┬──────┘                     └───────┬────────┘
//!                                        └──────────────┬─────────────────────┘
//!                                                       ▼
//!                                              front-door Traefik
//! ```

use std::path::PathBuf;

use clap::Parser;

use traefik_kobling::config::{load_config, Overrides};
use traefik_kobling::lifecycle::{signals, startup, Shutdown};
use traefik_kobling::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "traefik-kobling")]
#[command(about = "Aggregate several Traefik instances behind one front door", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "CONFIG_PATH", default_value = "/config.toml")]
    config: PathBuf,

    /// Publish to this Redis instance, overriding [exporter].
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Poll interval in seconds, overriding run_every.
    #[arg(long, env = "RUN_EVERY")]
    run_every: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let overrides = Overrides {
        redis_url: cli.redis_url,
        run_every: cli.run_every,
    };
    let config = load_config(&cli.config, &overrides)?;

    logging::init_logging(&config.observability);

    tracing::info!("traefik-kobling v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config = %cli.config.display(),
        servers = config.servers.len(),
        run_every_secs = config.run_every,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let worker = startup::build_worker(&config).await?;

    let shutdown = Shutdown::new();
    let worker_shutdown = shutdown.subscribe();
    signals::spawn_signal_handler(shutdown.clone());

    worker.run(worker_shutdown).await;

    tracing::info!("Shutdown complete");
    Ok(())
}
