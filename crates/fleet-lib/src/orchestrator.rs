//! Deployment orchestration
//!
//! Owns the end-to-end sequence for one request: provision the fleet, then,
//! when there are at least two replicas, plan and install redirection rules.
//! Every step is awaited in turn; nothing runs concurrently within a request.
//!
//! Requests are not serialized against each other. Two concurrent
//! deployments on the same host port can interleave their rule appends.

use crate::error::DeployError;
use crate::filter::PacketFilter;
use crate::installer::RuleInstaller;
use crate::models::{DeploymentRequest, DeploymentSpec, FleetResult, RedirectionRule};
use crate::observability::{DeploymentLogger, FleetMetrics};
use crate::planner;
use crate::provisioner::FleetProvisioner;
use crate::runtime::WorkloadRuntime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Lifecycle state of a deployment request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentState {
    Idle,
    Provisioning,
    /// Planning and installing redirection rules
    Installing,
    Done,
    Failed,
}

impl DeploymentState {
    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: DeploymentState) -> bool {
        use DeploymentState::*;
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (Idle, Provisioning)
                | (Provisioning, Failed)
                | (Provisioning, Done)
                | (Provisioning, Installing)
                | (Installing, Done)
                | (Installing, Failed)
        )
    }

    /// Done and Failed have no outgoing transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeploymentState::Done | DeploymentState::Failed)
    }
}

/// Tracks the visited states of one request
#[derive(Debug)]
struct Lifecycle {
    history: Vec<DeploymentState>,
}

impl Lifecycle {
    fn new() -> Self {
        Self {
            history: vec![DeploymentState::Idle],
        }
    }

    fn state(&self) -> DeploymentState {
        // History always starts with Idle
        self.history
            .last()
            .copied()
            .unwrap_or(DeploymentState::Idle)
    }

    fn advance(&mut self, next: DeploymentState) {
        debug_assert!(
            self.state().can_transition_to(next),
            "illegal transition {:?} -> {:?}",
            self.state(),
            next
        );
        debug!(from = ?self.state(), to = ?next, "Deployment state transition");
        self.history.push(next);
    }
}

/// Result of a successful deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentOutcome {
    pub name: String,
    pub state: DeploymentState,
    pub history: Vec<DeploymentState>,
    pub replicas: FleetResult,
    pub rules: Vec<RedirectionRule>,
}

/// Coordinates provisioning, planning and installation
pub struct Orchestrator {
    provisioner: FleetProvisioner,
    installer: RuleInstaller,
    logger: DeploymentLogger,
    metrics: FleetMetrics,
}

impl Orchestrator {
    /// Create an orchestrator over injected runtime and filter capabilities
    pub fn new(runtime: Arc<dyn WorkloadRuntime>, filter: Arc<dyn PacketFilter>) -> Self {
        Self {
            provisioner: FleetProvisioner::new(runtime),
            installer: RuleInstaller::new(filter),
            logger: DeploymentLogger::new("localhost"),
            metrics: FleetMetrics::new(),
        }
    }

    /// Replace the structured logger
    pub fn with_logger(mut self, logger: DeploymentLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Validate a wire request, then deploy it
    pub async fn deploy_request(
        &self,
        request: DeploymentRequest,
    ) -> Result<DeploymentOutcome, DeployError> {
        let spec = DeploymentSpec::try_from(request)?;
        self.deploy(spec).await
    }

    /// Deploy a validated spec
    ///
    /// Any failure is terminal: nothing is retried and nothing already
    /// created or installed is undone.
    pub async fn deploy(&self, spec: DeploymentSpec) -> Result<DeploymentOutcome, DeployError> {
        let started = Instant::now();
        let mut lifecycle = Lifecycle::new();

        let result = self.run(&spec, &mut lifecycle).await;
        let elapsed = started.elapsed().as_secs_f64();

        match result {
            Ok((replicas, rules)) => {
                lifecycle.advance(DeploymentState::Done);
                self.metrics.observe_deployment("done", elapsed);
                self.logger
                    .log_deployment_completed(&spec.name, replicas.len(), rules.len());

                Ok(DeploymentOutcome {
                    name: spec.name,
                    state: lifecycle.state(),
                    history: lifecycle.history,
                    replicas,
                    rules,
                })
            }
            Err(e) => {
                lifecycle.advance(DeploymentState::Failed);
                if let DeployError::Provisioning(ref p) = e {
                    self.metrics.inc_provisioning_errors(p.phase.as_str());
                }
                self.metrics.observe_deployment("failed", elapsed);
                self.logger.log_deployment_failed(&spec.name, &e);
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        spec: &DeploymentSpec,
        lifecycle: &mut Lifecycle,
    ) -> Result<(FleetResult, Vec<RedirectionRule>), DeployError> {
        lifecycle.advance(DeploymentState::Provisioning);
        self.logger.log_deployment_started(spec);

        let fleet = self.provisioner.provision(spec).await?;
        self.metrics.add_replicas_provisioned(fleet.len());
        for replica in &fleet {
            self.logger.log_replica_provisioned(&spec.name, replica);
        }

        // A single destination needs no split; no rule is installed at all
        if fleet.len() < 2 {
            self.logger.log_rules_skipped(&spec.name, fleet.len());
            return Ok((fleet, Vec::new()));
        }

        lifecycle.advance(DeploymentState::Installing);
        let rules = planner::plan(&fleet)?;
        for (index, rule) in rules.iter().enumerate() {
            self.logger.log_rule_planned(&spec.name, index, rule);
        }

        self.installer.install(spec.host_port, &rules).await?;
        self.metrics.add_rules_installed(rules.len());

        Ok((fleet, rules))
    }
}
