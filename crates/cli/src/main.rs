//! fleetctl - command-line client for the fleet daemon
//!
//! Submits deployments, lists running fleets, and previews the redirection
//! rules a fleet would receive.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{deploy, fleet, plan};

/// Fleet deployment CLI
#[derive(Parser)]
#[command(name = "fleetctl")]
#[command(author, version, about = "CLI for the fleet deployment daemon", long_about = None)]
pub struct Cli {
    /// Daemon URL (falls back to the config file, then http://localhost:8100)
    #[arg(long, env = "FLEETCTL_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Provision a fleet and balance its exposed port across the replicas
    Deploy {
        /// Fleet name, also used as the replica name prefix
        name: String,

        /// Image to run
        #[arg(long)]
        image: String,

        /// Externally exposed TCP port
        #[arg(long)]
        host_port: u16,

        /// First host port assigned to replicas
        #[arg(long)]
        port_space: u16,

        /// Number of replicas
        #[arg(long, default_value_t = 1)]
        replicas: u32,
    },

    /// List running instances of a fleet
    Fleet {
        /// Fleet name
        name: String,
    },

    /// Print the rule plan for a set of destinations without touching anything
    Plan {
        /// Destinations in address:port form, in install order
        #[arg(required_unless_present = "replicas", conflicts_with = "replicas")]
        destinations: Vec<String>,

        /// Plan for N placeholder replicas instead of explicit destinations
        #[arg(long)]
        replicas: Option<usize>,

        /// Comma-separated relative weights, one per destination
        #[arg(long, value_delimiter = ',')]
        weights: Option<Vec<f64>>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Deploy {
            name,
            image,
            host_port,
            port_space,
            replicas,
        } => {
            let client = client::ApiClient::new(&config::resolve_api_url(cli.api_url)?)?;
            let request = deploy::build_request(name, image, host_port, port_space, replicas);
            deploy::deploy(&client, request, cli.format).await?;
        }
        Commands::Fleet { name } => {
            let client = client::ApiClient::new(&config::resolve_api_url(cli.api_url)?)?;
            fleet::show_fleet(&client, &name, cli.format).await?;
        }
        Commands::Plan {
            destinations,
            replicas,
            weights,
        } => {
            let destinations = match replicas {
                Some(n) => plan::placeholder_destinations(n),
                None => destinations,
            };
            plan::show_plan(&destinations, weights.as_deref(), cli.format)?;
        }
    }

    Ok(())
}
