//! fleetd - replica provisioning and probabilistic DNAT balancing daemon
//!
//! Accepts deployment requests over HTTP, provisions replicas through the
//! local Docker daemon and spreads the exposed port across them with
//! iptables statistic rules.

use anyhow::Result;
use fleet_lib::{
    filter::{IptablesFilter, PacketFilter},
    health::{components, HealthRegistry},
    observability::{DeploymentLogger, FleetMetrics},
    runtime::{DockerRuntime, WorkloadRuntime},
    Orchestrator,
};
use fleetd::{api, config};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting fleetd");

    let config = config::DaemonConfig::load()?;
    info!(listen_port = config.listen_port, "Daemon configured");

    let health_registry = HealthRegistry::new();
    health_registry.register(components::RUNTIME).await;
    health_registry.register(components::PACKET_FILTER).await;

    let docker = match &config.docker_host {
        Some(host) => DockerRuntime::connect(host)?,
        None => DockerRuntime::from_env()?,
    };
    if let Err(e) = docker.ping().await {
        warn!(error = %e, "Docker is not reachable yet");
        health_registry
            .set_unhealthy(components::RUNTIME, format!("{:#}", e))
            .await;
    }

    let runtime: Arc<dyn WorkloadRuntime> = Arc::new(docker);
    let iptables = IptablesFilter::new(config.iptables());
    info!(
        binary = %iptables.config().binary,
        table = %iptables.config().table,
        chain = %iptables.config().chain,
        "Redirection rules will be appended"
    );
    let filter: Arc<dyn PacketFilter> = Arc::new(iptables);

    // Register metrics before the first scrape
    FleetMetrics::new();

    let orchestrator = Orchestrator::new(runtime.clone(), filter)
        .with_logger(DeploymentLogger::new(&config.host_name));

    let app_state = Arc::new(api::AppState::new(
        Arc::new(orchestrator),
        runtime,
        health_registry.clone(),
    ));

    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.listen_port, app_state));

    tokio::select! {
        result = api_handle => {
            result??;
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutting down");
        }
    }

    Ok(())
}
