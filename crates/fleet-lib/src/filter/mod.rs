//! Packet filter capability
//!
//! Rules are only ever appended to one fixed chain. The chain is never read,
//! listed or cleared from here.

mod iptables;

pub use iptables::{IptablesConfig, IptablesFilter};

use crate::models::format_probability;
use anyhow::Result;

pub use async_trait::async_trait;

/// Transport protocol matched by a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    #[default]
    Tcp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
        }
    }
}

/// One redirection rule as handed to the packet filter
#[derive(Debug, Clone, PartialEq)]
pub struct FilterRule {
    pub match_port: u16,
    pub protocol: Protocol,
    /// Random-mode statistic match; `None` makes the rule unconditional
    pub probability: Option<f64>,
    pub destination: String,
}

impl FilterRule {
    /// Arguments appending this rule to `table`/`chain`
    pub fn append_args(&self, table: &str, chain: &str) -> Vec<String> {
        let mut args = vec![
            "-t".to_string(),
            table.to_string(),
            "-A".to_string(),
            chain.to_string(),
            "-p".to_string(),
            self.protocol.as_str().to_string(),
            "--dport".to_string(),
            self.match_port.to_string(),
        ];

        if let Some(p) = self.probability {
            args.extend([
                "-m".to_string(),
                "statistic".to_string(),
                "--mode".to_string(),
                "random".to_string(),
                "--probability".to_string(),
                format_probability(p),
            ]);
        }

        args.extend([
            "-j".to_string(),
            "DNAT".to_string(),
            "--to-destination".to_string(),
            self.destination.clone(),
        ]);

        args
    }
}

/// Trait for packet filter implementations
#[async_trait]
pub trait PacketFilter: Send + Sync {
    /// Append one rule to the end of the managed chain
    async fn append_rule(&self, rule: &FilterRule) -> Result<()>;
}
