//! iptables-backed packet filter

use super::{FilterRule, PacketFilter};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Configuration for the iptables filter
#[derive(Debug, Clone)]
pub struct IptablesConfig {
    /// Binary to invoke (default: `iptables` from `PATH`)
    pub binary: String,
    /// Table holding the chain (default: `nat`)
    pub table: String,
    /// Chain rules are appended to (default: `PREROUTING`)
    pub chain: String,
}

impl Default for IptablesConfig {
    fn default() -> Self {
        Self {
            binary: "iptables".to_string(),
            table: "nat".to_string(),
            chain: "PREROUTING".to_string(),
        }
    }
}

/// Packet filter that shells out to iptables once per rule
#[derive(Debug, Clone, Default)]
pub struct IptablesFilter {
    config: IptablesConfig,
}

impl IptablesFilter {
    pub fn new(config: IptablesConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IptablesConfig {
        &self.config
    }
}

#[async_trait]
impl PacketFilter for IptablesFilter {
    async fn append_rule(&self, rule: &FilterRule) -> Result<()> {
        let args = rule.append_args(&self.config.table, &self.config.chain);
        debug!(binary = %self.config.binary, args = ?args, "Appending packet filter rule");

        let output = Command::new(&self.config.binary)
            .args(&args)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.config.binary))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            bail!(
                "{} exited with {}: {}{}",
                self.config.binary,
                output.status,
                stdout.trim(),
                stderr.trim()
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Protocol;

    fn rule() -> FilterRule {
        FilterRule {
            match_port: 8080,
            protocol: Protocol::Tcp,
            probability: Some(0.5),
            destination: "172.17.0.2:9000".to_string(),
        }
    }

    #[test]
    fn test_default_config_targets_nat_prerouting() {
        let filter = IptablesFilter::default();
        assert_eq!(filter.config().binary, "iptables");
        assert_eq!(filter.config().table, "nat");
        assert_eq!(filter.config().chain, "PREROUTING");
    }

    #[tokio::test]
    async fn test_append_rule_succeeds_on_zero_exit() {
        let filter = IptablesFilter::new(IptablesConfig {
            binary: "true".to_string(),
            ..Default::default()
        });

        assert!(filter.append_rule(&rule()).await.is_ok());
    }

    #[tokio::test]
    async fn test_append_rule_fails_on_nonzero_exit() {
        let filter = IptablesFilter::new(IptablesConfig {
            binary: "false".to_string(),
            ..Default::default()
        });

        let err = filter.append_rule(&rule()).await.unwrap_err();
        assert!(err.to_string().contains("false exited with"));
    }

    #[tokio::test]
    async fn test_append_rule_fails_when_binary_missing() {
        let filter = IptablesFilter::new(IptablesConfig {
            binary: "/nonexistent/iptables".to_string(),
            ..Default::default()
        });

        let err = filter.append_rule(&rule()).await.unwrap_err();
        assert!(err.to_string().contains("Failed to run"));
    }
}
