use std::path::PathBuf;

use clap::{Parser, Subcommand};

use traefik_kobling::config::{load_config, ExporterConfig, KoblingConfig, Overrides};
use traefik_kobling::export::{FileExporter, KeyValueExporter, MemoryStore};
use traefik_kobling::lifecycle::Shutdown;
use traefik_kobling::observability::logging;
use traefik_kobling::{Snapshot, Worker};

#[derive(Parser)]
#[command(name = "kobling-cli")]
#[command(about = "Operator CLI for Traefik Kobling", long_about = None)]
struct Cli {
    #[arg(short, long, env = "CONFIG_PATH", default_value = "/config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and summarise it
    Check,
    /// Poll every server once and print the merged entries
    Snapshot,
    /// Poll every server once and print the file exporter document
    Render,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config, &Overrides::default())?;
    logging::init_logging(&config.observability);

    match cli.command {
        Commands::Check => print_summary(&config),
        Commands::Snapshot => {
            let snapshot = poll_once(&config).await?;
            for (key, value) in &snapshot {
                println!("{} = {}", key, value);
            }
        }
        Commands::Render => {
            let snapshot = poll_once(&config).await?;
            let indent = match &config.exporter {
                Some(ExporterConfig::File { indent, .. }) => *indent,
                _ => 4,
            };
            let exporter = FileExporter::new("-", config.root_key.clone(), indent);
            print!("{}", exporter.render(&snapshot));
        }
    }

    Ok(())
}

fn print_summary(config: &KoblingConfig) {
    println!("Configuration OK");
    println!("  root key:  {}", config.root_key);
    println!("  run every: {}s", config.run_every);
    match &config.exporter {
        Some(ExporterConfig::Redis { url }) => println!("  exporter:  redis ({})", url),
        Some(ExporterConfig::File { path, indent }) => {
            println!("  exporter:  file ({}, indent {})", path, indent)
        }
        None => println!("  exporter:  none"),
    }
    println!("  servers:   {}", config.servers.len());
    for server in &config.servers {
        let entry_points: Vec<String> = server
            .entry_points
            .iter()
            .map(|(global, local)| format!("{}={}", global, local))
            .collect();
        println!(
            "    - {} -> {} [{}] middlewares={} services={}",
            server.name,
            server.destination_address,
            entry_points.join(", "),
            config.forwards_middlewares(server),
            config.forwards_services(server),
        );
    }
}

/// Build a snapshot without publishing it anywhere.
async fn poll_once(config: &KoblingConfig) -> Result<Snapshot, Box<dyn std::error::Error>> {
    let exporter = KeyValueExporter::new(MemoryStore::new(), config.root_key.clone());
    let worker = Worker::new(config, Box::new(exporter))?;

    let shutdown = Shutdown::new();
    let mut rx = shutdown.subscribe();
    let (snapshot, failures) = worker
        .build_snapshot(&mut rx)
        .await
        .ok_or("poll cancelled")?;

    if failures > 0 {
        eprintln!("warning: {} upstream fetch(es) failed, see log output", failures);
    }
    Ok(snapshot)
}
