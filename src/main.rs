use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use kitchen_memories::{cli, config, server};

#[derive(Parser)]
#[command(
    name = "kitchen-memories",
    version,
    about = "Photo-to-story memory server for kitchen objects"
)]
struct Cli {
    /// Config file (default: ~/.kitchen-memories/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve {
        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
        /// Storage backend: memory or sqlite (overrides config)
        #[arg(long)]
        backend: Option<String>,
    },
    /// List stored memories
    List {
        /// Only show one session
        #[arg(long)]
        session: Option<String>,
    },
    /// Show full details for one memory
    Inspect { id: String },
    /// Export all memories as JSON to stdout
    Export,
    /// Show memory statistics
    Stats {
        /// Print machine-readable JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::KitchenConfig::load_from(path)?,
        None => config::KitchenConfig::load()?,
    };

    // Logs go to stderr so `export` output stays clean JSON.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve { port, backend } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(backend) = backend {
                config.storage.backend = backend;
            }
            server::serve(config).await?;
        }
        Command::List { session } => cli::list::list(&config, session.as_deref())?,
        Command::Inspect { id } => cli::inspect::inspect(&config, &id)?,
        Command::Export => cli::export::export(&config)?,
        Command::Stats { json } => cli::stats::stats(&config, json)?,
    }

    Ok(())
}
