//! Rule installation
//!
//! Appends a planned rule sequence to the packet filter chain in order, so
//! install order equals evaluation order. Stops at the first failure and
//! leaves already-appended rules in place.

use crate::error::InstallationError;
use crate::filter::{FilterRule, PacketFilter, Protocol};
use crate::models::RedirectionRule;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct RuleInstaller {
    filter: Arc<dyn PacketFilter>,
}

impl RuleInstaller {
    pub fn new(filter: Arc<dyn PacketFilter>) -> Self {
        Self { filter }
    }

    /// Install `rules` for traffic arriving on `match_port`
    pub async fn install(
        &self,
        match_port: u16,
        rules: &[RedirectionRule],
    ) -> Result<(), InstallationError> {
        for (index, rule) in rules.iter().enumerate() {
            let filter_rule = FilterRule {
                match_port,
                protocol: Protocol::Tcp,
                probability: rule.probability,
                destination: rule.destination.clone(),
            };

            if let Err(source) = self.filter.append_rule(&filter_rule).await {
                warn!(
                    port = match_port,
                    index = index,
                    left_installed = index,
                    "Rule installation aborted, appended rules are not removed"
                );
                return Err(InstallationError {
                    index,
                    destination: rule.destination.clone(),
                    source,
                });
            }

            debug!(port = match_port, index = index, rule = %rule, "Installed rule");
        }

        Ok(())
    }
}
