//! Workload runtime capability
//!
//! The provisioner only needs to create, start and inspect instances. The
//! runtime is always injected so tests can substitute an in-memory fake.

mod docker;

pub use docker::DockerRuntime;

use crate::models::{CreateInstance, InstanceSummary};
use anyhow::Result;
use std::net::IpAddr;

pub use async_trait::async_trait;

/// Trait for container runtime implementations
#[async_trait]
pub trait WorkloadRuntime: Send + Sync {
    /// Create an instance and return its runtime-assigned identifier
    async fn create(&self, request: &CreateInstance) -> Result<String>;

    /// Start a previously created instance
    async fn start(&self, id: &str) -> Result<()>;

    /// Look up the internal address assigned to a started instance
    async fn inspect(&self, id: &str) -> Result<IpAddr>;

    /// List running instances carrying `key=value`
    async fn list_by_label(&self, key: &str, value: &str) -> Result<Vec<InstanceSummary>>;
}
