use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use voting_api::config::{CliOverrides, StoreBackend};

mod cmd;

#[derive(Parser)]
#[command(name = "voting-api")]
#[command(version, about = "Poll creation and voting API with realtime updates")]
pub struct Cli {
    /// Path to a TOML config file (defaults to ./voting.toml when present)
    #[arg(short, long, global = true, env = "VOTING_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP and WebSocket server
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to serve on
        #[arg(short, long)]
        port: Option<u16>,

        #[command(flatten)]
        store: StoreArgs,
    },
    /// Create the DynamoDB poll table if it does not exist
    CreateTable {
        #[command(flatten)]
        store: StoreArgs,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Args, Clone, Default)]
pub struct StoreArgs {
    /// Poll store backend: dynamo, memory
    #[arg(long = "store")]
    pub backend: Option<StoreBackend>,

    /// DynamoDB table name
    #[arg(long = "table")]
    pub table_name: Option<String>,

    /// AWS region
    #[arg(long)]
    pub region: Option<String>,

    /// Custom DynamoDB endpoint (e.g. http://localhost:8000)
    #[arg(long)]
    pub endpoint_url: Option<String>,
}

impl StoreArgs {
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            backend: self.backend,
            table_name: self.table_name.clone(),
            region: self.region.clone(),
            endpoint_url: self.endpoint_url.clone(),
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the resolved configuration
    Show,
    /// Validate configuration and report any problems
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match &cli.command {
        Commands::Serve { host, port, store } => {
            let overrides = CliOverrides {
                host: host.clone(),
                port: *port,
                ..store.overrides()
            };
            cmd::cmd_serve(config_path, &overrides).await?;
        }
        Commands::CreateTable { store } => {
            cmd::cmd_create_table(config_path, &store.overrides()).await?;
        }
        Commands::Config { command } => cmd::cmd_config(config_path, command.clone())?,
    }

    Ok(())
}
