//! Error taxonomy for deployments
//!
//! Every error is terminal for the request that raised it. None are retried.

use std::fmt;
use thiserror::Error;

/// Malformed deployment request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("image must not be empty")]
    EmptyImage,

    #[error("fleet name must not be empty")]
    EmptyName,

    #[error("invalid host port: {0:?}")]
    InvalidHostPort(String),

    #[error("replica count must not be negative: {0}")]
    NegativeReplicas(i64),

    #[error("invalid container port space: {0}")]
    InvalidPortSpace(i64),

    #[error("port space {port_space} cannot hold {replicas} replicas")]
    PortSpaceOverflow { port_space: u16, replicas: usize },
}

/// Step of the replica lifecycle that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningPhase {
    Create,
    Start,
    Inspect,
}

impl ProvisioningPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisioningPhase::Create => "create",
            ProvisioningPhase::Start => "start",
            ProvisioningPhase::Inspect => "inspect",
        }
    }
}

impl fmt::Display for ProvisioningPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime create/start/inspect failure for one replica
#[derive(Debug, Error)]
#[error("replica {index} failed to {phase}: {source:#}")]
pub struct ProvisioningError {
    pub index: usize,
    pub phase: ProvisioningPhase,
    #[source]
    pub source: anyhow::Error,
}

/// Rule planner contract violation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanningError {
    #[error("at least 2 destinations are required, got {0}")]
    TooFewDestinations(usize),

    #[error("weight {weight} at position {index} must be finite and positive")]
    InvalidWeight { index: usize, weight: f64 },
}

/// Packet filter append failure
#[derive(Debug, Error)]
#[error("rule {index} to {destination} could not be installed: {source:#}")]
pub struct InstallationError {
    pub index: usize,
    pub destination: String,
    #[source]
    pub source: anyhow::Error,
}

/// Any failure of a deployment request
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("provisioning failed: {0}")]
    Provisioning(#[from] ProvisioningError),

    #[error("planning failed: {0}")]
    Planning(#[from] PlanningError),

    #[error("installation failed: {0}")]
    Installation(#[from] InstallationError),
}

impl DeployError {
    /// Stage of the deployment that failed
    pub fn phase(&self) -> &'static str {
        match self {
            DeployError::Validation(_) => "validate",
            DeployError::Provisioning(e) => e.phase.as_str(),
            DeployError::Planning(_) => "plan",
            DeployError::Installation(_) => "install",
        }
    }

    /// Replica or rule index the failure is tagged with, if any
    pub fn index(&self) -> Option<usize> {
        match self {
            DeployError::Provisioning(e) => Some(e.index),
            DeployError::Installation(e) => Some(e.index),
            _ => None,
        }
    }

    /// True when the request itself was malformed
    pub fn is_client_error(&self) -> bool {
        matches!(self, DeployError::Validation(_))
    }
}
