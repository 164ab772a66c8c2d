//! Fleet provisioning
//!
//! Creates every replica first, then starts and inspects them one by one in
//! creation order. The first failure aborts the whole sequence. Instances
//! created or started before the failure are left in place; there is no
//! rollback.

use crate::error::{ProvisioningError, ProvisioningPhase};
use crate::models::{CreateInstance, DeploymentSpec, FleetResult, ReplicaDescriptor};
use crate::runtime::WorkloadRuntime;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Drives create → start → inspect for every replica of a fleet
pub struct FleetProvisioner {
    runtime: Arc<dyn WorkloadRuntime>,
}

/// Instance that exists in the runtime but has not been started yet
struct CreatedInstance {
    id: String,
    name: String,
    index: usize,
    port: u16,
}

impl FleetProvisioner {
    pub fn new(runtime: Arc<dyn WorkloadRuntime>) -> Self {
        Self { runtime }
    }

    /// Provision exactly `spec.replicas` replicas, in index order
    pub async fn provision(&self, spec: &DeploymentSpec) -> Result<FleetResult, ProvisioningError> {
        let created = self.create_all(spec).await?;

        let mut fleet = Vec::with_capacity(created.len());
        for instance in created.iter() {
            match self.start_and_inspect(instance).await {
                Ok(replica) => fleet.push(replica),
                Err(e) => {
                    warn!(
                        fleet = %spec.name,
                        index = e.index,
                        phase = %e.phase,
                        left_created = created.len(),
                        replicas_ready = fleet.len(),
                        "Provisioning aborted, existing instances are not cleaned up"
                    );
                    return Err(e);
                }
            }
        }

        info!(fleet = %spec.name, replicas = fleet.len(), "Fleet provisioned");
        Ok(fleet)
    }

    async fn create_all(
        &self,
        spec: &DeploymentSpec,
    ) -> Result<Vec<CreatedInstance>, ProvisioningError> {
        let labels = spec.labels();
        let mut created = Vec::with_capacity(spec.replicas);

        for index in 0..spec.replicas {
            let request = CreateInstance {
                name: spec.replica_name(index),
                image: spec.image.clone(),
                exposed_port: spec.host_port,
                host_port: spec.replica_port(index),
                labels: labels.clone(),
            };

            let id = self.runtime.create(&request).await.map_err(|source| {
                warn!(
                    fleet = %spec.name,
                    index = index,
                    left_created = created.len(),
                    "Provisioning aborted, existing instances are not cleaned up"
                );
                ProvisioningError {
                    index,
                    phase: ProvisioningPhase::Create,
                    source,
                }
            })?;

            debug!(container_id = %id, name = %request.name, port = request.host_port, "Created replica");

            created.push(CreatedInstance {
                id,
                name: request.name,
                index,
                port: request.host_port,
            });
        }

        Ok(created)
    }

    async fn start_and_inspect(
        &self,
        instance: &CreatedInstance,
    ) -> Result<ReplicaDescriptor, ProvisioningError> {
        let fail = |phase: ProvisioningPhase| {
            move |source: anyhow::Error| ProvisioningError {
                index: instance.index,
                phase,
                source,
            }
        };

        self.runtime
            .start(&instance.id)
            .await
            .map_err(fail(ProvisioningPhase::Start))?;
        debug!(container_id = %instance.id, "Started replica");

        let ip = self
            .runtime
            .inspect(&instance.id)
            .await
            .map_err(fail(ProvisioningPhase::Inspect))?;

        Ok(ReplicaDescriptor {
            id: instance.id.clone(),
            name: instance.name.clone(),
            index: instance.index,
            port: instance.port,
            ip,
        })
    }
}
