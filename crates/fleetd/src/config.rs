//! Daemon configuration

use anyhow::Result;
use fleet_lib::filter::IptablesConfig;
use serde::Deserialize;

/// Daemon configuration, read from `FLEETD_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// Name reported in structured logs
    #[serde(default = "default_host_name")]
    pub host_name: String,

    /// Port for the deploy/health/metrics API
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Docker endpoint; `DOCKER_HOST` or the local socket when unset
    #[serde(default)]
    pub docker_host: Option<String>,

    /// Packet filter binary
    #[serde(default = "default_iptables_path")]
    pub iptables_path: String,

    /// Table holding the redirection chain
    #[serde(default = "default_table")]
    pub table: String,

    /// Chain redirection rules are appended to
    #[serde(default = "default_chain")]
    pub chain: String,
}

fn default_host_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_listen_port() -> u16 {
    8100
}

fn default_iptables_path() -> String {
    "iptables".to_string()
}

fn default_table() -> String {
    "nat".to_string()
}

fn default_chain() -> String {
    "PREROUTING".to_string()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            host_name: default_host_name(),
            listen_port: default_listen_port(),
            docker_host: None,
            iptables_path: default_iptables_path(),
            table: default_table(),
            chain: default_chain(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        Self::from_source(config::Environment::with_prefix("FLEETD"))
    }

    fn from_source<S>(source: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = config::Config::builder().add_source(source).build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn iptables(&self) -> IptablesConfig {
        IptablesConfig {
            binary: self.iptables_path.clone(),
            table: self.table.clone(),
            chain: self.chain.clone(),
        }
    }
}
