//! Docker Engine runtime backed by bollard

use super::WorkloadRuntime;
use crate::models::{CreateInstance, InstanceSummary};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, ListContainersOptions,
    StartContainerOptions,
};
use bollard::models::{ContainerInspectResponse, HostConfig, PortBinding};
use bollard::Docker;
use std::collections::HashMap;
use std::net::IpAddr;
use tracing::{debug, info};

/// Request timeout for Docker API calls, in seconds
const DOCKER_TIMEOUT_SECS: u64 = 120;

/// Runtime client talking to a Docker daemon
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect using `DOCKER_HOST` or the platform's local socket
    pub fn from_env() -> Result<Self> {
        let docker =
            Docker::connect_with_local_defaults().context("Failed to connect to Docker")?;
        Ok(Self { docker })
    }

    /// Connect to an explicit `unix://` or `tcp://`/`http://` endpoint
    pub fn connect(host: &str) -> Result<Self> {
        let docker = if let Some(path) = host.strip_prefix("unix://") {
            Docker::connect_with_unix(path, DOCKER_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
        } else {
            let addr = host.replacen("tcp://", "http://", 1);
            Docker::connect_with_http(&addr, DOCKER_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
        }
        .with_context(|| format!("Failed to connect to Docker at {}", host))?;

        info!(host = %host, "Connected to Docker");
        Ok(Self { docker })
    }

    /// Check that the daemon answers
    pub async fn ping(&self) -> Result<()> {
        self.docker.ping().await.context("Docker ping failed")?;
        Ok(())
    }

    fn container_config(request: &CreateInstance) -> Config<String> {
        let exposed = format!("{}/tcp", request.exposed_port);

        let port_bindings = HashMap::from([(
            exposed.clone(),
            Some(vec![PortBinding {
                host_ip: Some("0.0.0.0".to_string()),
                host_port: Some(request.host_port.to_string()),
            }]),
        )]);

        Config {
            image: Some(request.image.clone()),
            exposed_ports: Some(HashMap::from([(exposed, HashMap::new())])),
            labels: Some(request.labels.clone()),
            host_config: Some(HostConfig {
                port_bindings: Some(port_bindings),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

/// Pull the default-network IP out of an inspect response
fn extract_ip(response: &ContainerInspectResponse) -> Option<IpAddr> {
    let settings = response.network_settings.as_ref()?;

    let default_ip = settings
        .ip_address
        .as_deref()
        .filter(|ip| !ip.is_empty())
        .map(str::to_string);

    // User-defined networks leave the legacy field empty
    let network_ip = || {
        settings.networks.as_ref().and_then(|networks| {
            let mut names: Vec<_> = networks.keys().collect();
            names.sort();
            names.into_iter().find_map(|name| {
                networks[name]
                    .ip_address
                    .as_deref()
                    .filter(|ip| !ip.is_empty())
                    .map(str::to_string)
            })
        })
    };

    default_ip.or_else(network_ip)?.parse().ok()
}

#[async_trait]
impl WorkloadRuntime for DockerRuntime {
    async fn create(&self, request: &CreateInstance) -> Result<String> {
        let options = CreateContainerOptions {
            name: request.name.clone(),
            ..Default::default()
        };

        let response = self
            .docker
            .create_container(Some(options), Self::container_config(request))
            .await
            .with_context(|| format!("Failed to create container {}", request.name))?;

        for warning in &response.warnings {
            debug!(container = %request.name, warning = %warning, "Docker create warning");
        }

        Ok(response.id)
    }

    async fn start(&self, id: &str) -> Result<()> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .with_context(|| format!("Failed to start container {}", id))
    }

    async fn inspect(&self, id: &str) -> Result<IpAddr> {
        let response = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .with_context(|| format!("Failed to inspect container {}", id))?;

        extract_ip(&response).ok_or_else(|| anyhow!("container {} has no IP address", id))
    }

    async fn list_by_label(&self, key: &str, value: &str) -> Result<Vec<InstanceSummary>> {
        let filters = HashMap::from([(
            "label".to_string(),
            vec![format!("{}={}", key, value)],
        )]);

        let containers = self
            .docker
            .list_containers(Some(ListContainersOptions::<String> {
                all: false,
                filters,
                ..Default::default()
            }))
            .await
            .context("Failed to list containers")?;

        Ok(containers
            .into_iter()
            .map(|c| InstanceSummary {
                id: c.id.unwrap_or_default(),
                names: c
                    .names
                    .unwrap_or_default()
                    .into_iter()
                    .map(|n| n.trim_start_matches('/').to_string())
                    .collect(),
                image: c.image.unwrap_or_default(),
                state: c.state.unwrap_or_default(),
                labels: c.labels.unwrap_or_default(),
            })
            .collect())
    }
}
