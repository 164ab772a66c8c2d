//! Fleet library for replica provisioning and probabilistic DNAT balancing
//!
//! This crate provides the core functionality for:
//! - Provisioning a fleet of identical container replicas
//! - Planning cascading-probability redirection rules
//! - Installing those rules into a packet filter chain
//! - Orchestrating a deployment end to end
//! - Health checks and observability

pub mod error;
pub mod filter;
pub mod health;
pub mod installer;
pub mod models;
pub mod observability;
pub mod orchestrator;
pub mod planner;
pub mod provisioner;
pub mod runtime;

#[cfg(test)]
mod fakes;

pub use error::{
    DeployError, InstallationError, PlanningError, ProvisioningError, ProvisioningPhase,
    ValidationError,
};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{DeploymentLogger, FleetMetrics};
pub use orchestrator::{DeploymentOutcome, DeploymentState, Orchestrator};
