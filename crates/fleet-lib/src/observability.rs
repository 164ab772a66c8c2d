//! Observability infrastructure for fleet deployments
//!
//! Provides:
//! - Prometheus metrics (deployment outcomes and duration, replicas, rules)
//! - Structured JSON logging with tracing

use crate::error::DeployError;
use crate::models::{DeploymentSpec, RedirectionRule, ReplicaDescriptor};
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for deployment duration (in seconds)
const DURATION_BUCKETS: &[f64] = &[0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<FleetMetricsInner> = OnceLock::new();

struct FleetMetricsInner {
    deployments_total: IntCounterVec,
    deployment_duration_seconds: Histogram,
    replicas_provisioned: IntCounter,
    rules_installed: IntCounter,
    provisioning_errors: IntCounterVec,
}

impl FleetMetricsInner {
    fn new() -> Self {
        Self {
            deployments_total: register_int_counter_vec!(
                "fleet_deployments_total",
                "Deployment requests by outcome",
                &["outcome"]
            )
            .expect("Failed to register deployments_total"),

            deployment_duration_seconds: register_histogram!(
                "fleet_deployment_duration_seconds",
                "Wall time from validation to the final state",
                DURATION_BUCKETS.to_vec()
            )
            .expect("Failed to register deployment_duration_seconds"),

            replicas_provisioned: register_int_counter!(
                "fleet_replicas_provisioned_total",
                "Replicas created, started and inspected successfully"
            )
            .expect("Failed to register replicas_provisioned"),

            rules_installed: register_int_counter!(
                "fleet_rules_installed_total",
                "Redirection rules appended to the packet filter chain"
            )
            .expect("Failed to register rules_installed"),

            provisioning_errors: register_int_counter_vec!(
                "fleet_provisioning_errors_total",
                "Provisioning failures by runtime phase",
                &["phase"]
            )
            .expect("Failed to register provisioning_errors"),
        }
    }
}

/// Fleet metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share it.
#[derive(Clone)]
pub struct FleetMetrics {
    _private: (),
}

impl Default for FleetMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl FleetMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(FleetMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &FleetMetricsInner {
        GLOBAL_METRICS.get_or_init(FleetMetricsInner::new)
    }

    /// Record a finished deployment
    pub fn observe_deployment(&self, outcome: &str, duration_secs: f64) {
        let inner = self.inner();
        inner.deployments_total.with_label_values(&[outcome]).inc();
        inner.deployment_duration_seconds.observe(duration_secs);
    }

    pub fn add_replicas_provisioned(&self, count: usize) {
        self.inner().replicas_provisioned.inc_by(count as u64);
    }

    pub fn add_rules_installed(&self, count: usize) {
        self.inner().rules_installed.inc_by(count as u64);
    }

    pub fn inc_provisioning_errors(&self, phase: &str) {
        self.inner()
            .provisioning_errors
            .with_label_values(&[phase])
            .inc();
    }
}

/// Structured logger for deployment events
#[derive(Clone)]
pub struct DeploymentLogger {
    host: String,
}

impl DeploymentLogger {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    pub fn log_deployment_started(&self, spec: &DeploymentSpec) {
        info!(
            event = "deployment_started",
            host = %self.host,
            fleet = %spec.name,
            image = %spec.image,
            host_port = spec.host_port,
            port_space = spec.port_space,
            replicas = spec.replicas,
            "Deployment started"
        );
    }

    pub fn log_replica_provisioned(&self, fleet: &str, replica: &ReplicaDescriptor) {
        info!(
            event = "replica_provisioned",
            host = %self.host,
            fleet = %fleet,
            container_id = %replica.id,
            name = %replica.name,
            destination = %replica.destination(),
            "Replica running"
        );
    }

    pub fn log_rule_planned(&self, fleet: &str, index: usize, rule: &RedirectionRule) {
        info!(
            event = "rule_planned",
            host = %self.host,
            fleet = %fleet,
            index = index,
            probability = ?rule.probability_arg(),
            destination = %rule.destination,
            "Redirection rule planned"
        );
    }

    pub fn log_rules_skipped(&self, fleet: &str, replicas: usize) {
        info!(
            event = "rules_skipped",
            host = %self.host,
            fleet = %fleet,
            replicas = replicas,
            "Fewer than two replicas, no redirection rules installed"
        );
    }

    pub fn log_deployment_completed(&self, fleet: &str, replicas: usize, rules: usize) {
        info!(
            event = "deployment_completed",
            host = %self.host,
            fleet = %fleet,
            replicas = replicas,
            rules = rules,
            "Deployment completed"
        );
    }

    pub fn log_deployment_failed(&self, fleet: &str, error: &DeployError) {
        warn!(
            event = "deployment_failed",
            host = %self.host,
            fleet = %fleet,
            phase = %error.phase(),
            index = ?error.index(),
            error = %error,
            "Deployment failed"
        );
    }
}
